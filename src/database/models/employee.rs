use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::database::types::Numeric;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum ContractType {
        Monthly => "monthly",
        Daily => "daily",
        Hourly => "hourly",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentMethod {
        BankTransfer => "bank_transfer",
        Cash => "cash",
        MobileWallet => "mobile_wallet",
        Cheque => "cheque",
    }
}

/// Employment terms as the employee directory reports them for a period.
/// A copy of the relevant fields is frozen onto each `EmployeePayroll`
/// row at import time, so later directory edits cannot change a payroll
/// that is already in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    pub employee_id: Uuid,
    pub name: String,
    pub position: Option<String>,
    pub department: Option<String>,
    pub contract_type: ContractType,
    pub payment_method: PaymentMethod,
    /// Monthly salary, daily rate or hourly rate depending on the
    /// contract type.
    pub base_rate: Numeric,
    pub scheduled_start: NaiveTime,
    pub scheduled_daily_hours: Numeric,
    pub overtime_multiplier: Numeric,
    pub late_forgiveness_minutes: i64,
    pub late_forgiveness_per_quarter: i64,
    pub absence_charge: Numeric,
    pub late_charge: Numeric,
    pub excess_leave_charge: Numeric,
    pub leave_allowance_days: Numeric,
}
