use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::database::types::Numeric;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum DeductionCategory {
        Absence => "absence",
        Late => "late",
        ExcessLeave => "excess_leave",
        Loan => "loan",
        Tax => "tax",
        Insurance => "insurance",
        Pension => "pension",
        Welfare => "welfare",
        Other => "other",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum CalculationMethod {
        FixedAmount => "fixed_amount",
        PercentageOfGross => "percentage_of_gross",
        PercentageOfBasic => "percentage_of_basic",
        PercentageOfNet => "percentage_of_net",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum DeductionFrequency {
        PerPayroll => "per_payroll",
        Monthly => "monthly",
        Quarterly => "quarterly",
        SemiAnnual => "semi_annual",
        Annual => "annual",
        OneTime => "one_time",
    }
}

/// Catalog entry describing a kind of deduction, optionally scoped to a
/// site.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeductionType {
    pub id: Uuid,
    pub site_id: Option<Uuid>,
    pub name: String,
    pub category: DeductionCategory,
    pub is_mandatory: bool,
    pub is_percentage: bool,
    pub is_taxable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionTypeInput {
    pub site_id: Option<Uuid>,
    pub name: String,
    pub category: DeductionCategory,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub is_percentage: bool,
    #[serde(default)]
    pub is_taxable: bool,
}

/// A recurring deduction assigned to one employee. Lower `priority`
/// values are evaluated first when a payroll is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDeduction {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub deduction_type_id: Uuid,
    pub method: CalculationMethod,
    pub percentage: Option<Numeric>,
    pub amount: Option<Numeric>,
    pub max_amount: Option<Numeric>,
    pub frequency: DeductionFrequency,
    pub priority: i64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
    pub is_active: bool,
    pub total_deducted: Numeric,
    pub deduction_count: i64,
    pub last_deduction_date: Option<NaiveDate>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDeductionInput {
    pub employee_id: Uuid,
    pub deduction_type_id: Uuid,
    pub method: CalculationMethod,
    pub percentage: Option<Numeric>,
    pub amount: Option<Numeric>,
    pub max_amount: Option<Numeric>,
    pub frequency: DeductionFrequency,
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

fn default_priority() -> i64 {
    100
}

/// One realized deduction on one employee's payroll line. Append-only;
/// totals are always recomputed from these rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollDeduction {
    pub id: Uuid,
    pub employee_payroll_id: Uuid,
    pub category: DeductionCategory,
    pub label: String,
    pub amount: Numeric,
    pub deduction_type_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayrollDeduction {
    pub employee_payroll_id: Uuid,
    pub category: DeductionCategory,
    pub label: String,
    pub amount: Numeric,
    pub deduction_type_id: Option<Uuid>,
    pub loan_id: Option<Uuid>,
}
