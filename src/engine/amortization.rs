use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::database::models::Loan;
use crate::database::types::Numeric;

/// Fixed monthly installment for a loan:
/// `M = P * r * (1 + r)^n / ((1 + r)^n - 1)` with `r` the monthly rate.
/// A missing or zero annual rate degrades to straight division of the
/// principal. Callers validate `principal > 0` and `term_months >= 1`.
pub fn monthly_installment(
    principal: Numeric,
    term_months: i64,
    annual_rate_percent: Option<Numeric>,
) -> Numeric {
    let principal = principal.inner();
    let annual_rate = annual_rate_percent
        .map(|r| r.inner())
        .unwrap_or(Decimal::ZERO);

    if annual_rate.is_zero() {
        return Numeric::new(principal / Decimal::from(term_months)).round2();
    }

    let monthly_rate = annual_rate / dec!(100) / dec!(12);
    let base = Decimal::ONE + monthly_rate;

    // (1 + r)^n by iterated multiplication; decimal stays exact for the
    // term lengths loans actually have.
    let mut compound = Decimal::ONE;
    for _ in 0..term_months {
        compound *= base;
    }

    let installment = principal * monthly_rate * compound / (compound - Decimal::ONE);
    Numeric::new(installment).round2()
}

/// Installments left at the current balance, rounding the last partial
/// one up. Reporting only; repayment always works off the balance.
pub fn payments_remaining(remaining_balance: Numeric, monthly_installment: Numeric) -> i64 {
    if !remaining_balance.is_positive() {
        return 0;
    }
    remaining_balance.div_ceil_count(monthly_installment)
}

/// The amount the next payroll run takes: the fixed installment,
/// clamped to the remaining balance for the final payment.
pub fn next_installment(loan: &Loan) -> Numeric {
    loan.monthly_installment.min(loan.remaining_balance)
}
