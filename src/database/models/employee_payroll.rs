use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::{ContractType, EmployeeProfile, PaymentMethod};
use crate::database::types::Numeric;

/// One employee's line in a payroll. Employment terms are frozen here at
/// import time; day-level detail lives in `AttendanceSnapshot` rows and
/// deduction detail in `PayrollDeduction` rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePayroll {
    pub id: Uuid,
    pub payroll_id: Uuid,
    pub employee_id: Uuid,
    pub employee_name: String,
    pub contract_type: ContractType,
    pub position: Option<String>,
    pub department: Option<String>,
    pub payment_method: PaymentMethod,
    pub base_rate: Numeric,
    pub scheduled_daily_hours: Numeric,
    pub overtime_multiplier: Numeric,
    pub absence_charge: Numeric,
    pub late_charge: Numeric,
    pub excess_leave_charge: Numeric,
    pub leave_allowance_days: Numeric,
    pub worked_days: Numeric,
    pub absent_days: Numeric,
    pub late_days: Numeric,
    pub leave_days: Numeric,
    pub excess_leave_days: Numeric,
    pub holiday_days: Numeric,
    pub worked_hours: Numeric,
    pub overtime_hours: Numeric,
    pub overtime_pay: Numeric,
    pub gross_pay: Numeric,
    pub total_deductions: Numeric,
    pub net_pay: Numeric,
    pub version: i64,
    pub imported_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Counts accumulated from one employee's classified days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceTally {
    pub worked_days: Numeric,
    pub absent_days: Numeric,
    pub late_days: Numeric,
    pub leave_days: Numeric,
    pub holiday_days: Numeric,
    pub worked_hours: Numeric,
}

#[derive(Debug, Clone)]
pub struct NewEmployeePayroll {
    pub payroll_id: Uuid,
    pub profile: EmployeeProfile,
    pub tally: AttendanceTally,
}
