use crate::database::models::{ContractType, EmployeePayroll, PayrollDeduction};
use crate::database::types::Numeric;

/// Divisor for turning a monthly salary into an hourly equivalent when
/// pricing overtime.
const WORKING_DAYS_PER_MONTH: i64 = 22;

/// Base compensation before overtime. Monthly contracts always earn the
/// full salary; attendance effects come back as deduction rows, never
/// as gross scaling.
pub fn basic_pay(employee_payroll: &EmployeePayroll) -> Numeric {
    match employee_payroll.contract_type {
        ContractType::Monthly => employee_payroll.base_rate,
        ContractType::Daily => (employee_payroll.base_rate
            * (employee_payroll.worked_days + employee_payroll.holiday_days))
            .round2(),
        ContractType::Hourly => (employee_payroll.base_rate
            * (employee_payroll.worked_hours - employee_payroll.overtime_hours))
            .round2(),
    }
}

pub fn gross_pay(employee_payroll: &EmployeePayroll) -> Numeric {
    (basic_pay(employee_payroll) + employee_payroll.overtime_pay).round2()
}

/// Rate one overtime hour is priced from, before the multiplier.
pub fn hourly_equivalent_rate(employee_payroll: &EmployeePayroll) -> Numeric {
    match employee_payroll.contract_type {
        ContractType::Hourly => employee_payroll.base_rate,
        ContractType::Daily => {
            employee_payroll.base_rate / employee_payroll.scheduled_daily_hours
        }
        ContractType::Monthly => {
            employee_payroll.base_rate
                / (Numeric::from(WORKING_DAYS_PER_MONTH)
                    * employee_payroll.scheduled_daily_hours)
        }
    }
}

pub fn overtime_pay(employee_payroll: &EmployeePayroll, overtime_hours: Numeric) -> Numeric {
    (hourly_equivalent_rate(employee_payroll)
        * employee_payroll.overtime_multiplier
        * overtime_hours)
        .round2()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmployeeTotals {
    pub gross_pay: Numeric,
    pub total_deductions: Numeric,
    pub net_pay: Numeric,
}

/// Recompute one line's totals from its persisted deduction rows. This
/// is the only way totals are ever produced, so running it twice always
/// gives the same answer.
pub fn employee_totals(
    employee_payroll: &EmployeePayroll,
    deductions: &[PayrollDeduction],
) -> EmployeeTotals {
    let gross_pay = gross_pay(employee_payroll);
    let total_deductions: Numeric = deductions.iter().map(|d| d.amount).sum();

    EmployeeTotals {
        gross_pay,
        total_deductions,
        net_pay: gross_pay - total_deductions,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayrollTotals {
    pub gross: Numeric,
    pub deductions: Numeric,
    pub net: Numeric,
}

pub fn payroll_totals(lines: &[EmployeeTotals]) -> PayrollTotals {
    let mut totals = PayrollTotals::default();
    for line in lines {
        totals.gross += line.gross_pay;
        totals.deductions += line.total_deductions;
        totals.net += line.net_pay;
    }
    totals
}

/// Leave taken beyond the allowance, never negative.
pub fn excess_leave_days(leave_days: Numeric, allowance_days: Numeric) -> Numeric {
    (leave_days - allowance_days).max(Numeric::ZERO)
}
