use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

/// Exact decimal value stored as a canonical string in SQLite.
///
/// SQLite has no decimal storage class, so monetary amounts, rates and
/// fractional day counts are persisted as TEXT and parsed back through
/// `rust_decimal`. Floats never touch these columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Numeric(pub Decimal);

impl Numeric {
    pub const ZERO: Numeric = Numeric(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Numeric(value)
    }

    /// Round to two decimal places, ties away from zero.
    pub fn round2(self) -> Self {
        Numeric(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn min(self, other: Numeric) -> Numeric {
        Numeric(self.0.min(other.0))
    }

    pub fn max(self, other: Numeric) -> Numeric {
        Numeric(self.0.max(other.0))
    }

    /// Ceiling of `self / divisor` as an integer count. Returns zero when
    /// the divisor is not positive.
    pub fn div_ceil_count(self, divisor: Numeric) -> i64 {
        if !divisor.is_positive() {
            return 0;
        }
        (self.0 / divisor.0).ceil().to_i64().unwrap_or(i64::MAX)
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Numeric {
    fn from(value: Decimal) -> Self {
        Numeric(value)
    }
}

impl From<i64> for Numeric {
    fn from(value: i64) -> Self {
        Numeric(Decimal::from(value))
    }
}

impl From<u32> for Numeric {
    fn from(value: u32) -> Self {
        Numeric(Decimal::from(value))
    }
}

impl FromStr for Numeric {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Numeric(Decimal::from_str(s)?))
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add for Numeric {
    type Output = Numeric;

    fn add(self, rhs: Numeric) -> Numeric {
        Numeric(self.0 + rhs.0)
    }
}

impl Sub for Numeric {
    type Output = Numeric;

    fn sub(self, rhs: Numeric) -> Numeric {
        Numeric(self.0 - rhs.0)
    }
}

impl Mul for Numeric {
    type Output = Numeric;

    fn mul(self, rhs: Numeric) -> Numeric {
        Numeric(self.0 * rhs.0)
    }
}

impl Div for Numeric {
    type Output = Numeric;

    fn div(self, rhs: Numeric) -> Numeric {
        Numeric(self.0 / rhs.0)
    }
}

impl Neg for Numeric {
    type Output = Numeric;

    fn neg(self) -> Numeric {
        Numeric(-self.0)
    }
}

impl AddAssign for Numeric {
    fn add_assign(&mut self, rhs: Numeric) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Numeric {
    fn sub_assign(&mut self, rhs: Numeric) {
        self.0 -= rhs.0;
    }
}

impl Sum for Numeric {
    fn sum<I: Iterator<Item = Numeric>>(iter: I) -> Numeric {
        iter.fold(Numeric::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Numeric> for Numeric {
    fn sum<I: Iterator<Item = &'a Numeric>>(iter: I) -> Numeric {
        iter.fold(Numeric::ZERO, |acc, n| acc + *n)
    }
}

impl sqlx::Type<sqlx::Sqlite> for Numeric {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <String as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for Numeric {
    fn encode_by_ref(
        &self,
        args: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Sqlite>>::encode(self.0.to_string(), args)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for Numeric {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Ok(Numeric(Decimal::from_str(&s)?))
    }
}
