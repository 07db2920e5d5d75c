use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::database::types::Numeric;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum LoanStatus {
        Pending => "pending",
        Approved => "approved",
        Active => "active",
        Completed => "completed",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

impl LoanStatus {
    /// Only active loans take installments from payroll.
    pub fn is_deductible(self) -> bool {
        self == LoanStatus::Active
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoanStatus::Completed | LoanStatus::Rejected | LoanStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub principal: Numeric,
    pub term_months: i64,
    /// Percent per year, e.g. `12` for 12%. `None` means an
    /// interest-free loan.
    pub annual_interest_rate: Option<Numeric>,
    pub monthly_installment: Numeric,
    pub remaining_balance: Numeric,
    pub status: LoanStatus,
    pub requested_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub completed_on: Option<NaiveDate>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanInput {
    pub employee_id: Uuid,
    pub principal: Numeric,
    pub term_months: i64,
    pub annual_interest_rate: Option<Numeric>,
}

/// Repayment ledger entry. `employee_payroll_id` links payments taken
/// through payroll; manual repayments leave it empty.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LoanPayment {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub employee_payroll_id: Option<Uuid>,
    pub amount: Numeric,
    pub balance_after: Numeric,
    pub paid_at: DateTime<Utc>,
}
