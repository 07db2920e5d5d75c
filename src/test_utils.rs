use chrono::{NaiveDate, NaiveTime, Utc};
use fake::Fake;
use fake::faker::name::en::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::database::models::*;
use crate::database::types::Numeric;

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// Mock data generators using the fake crate
pub struct MockData;

impl MockData {
    /// Monthly-salaried profile with a 09:00 start, eight-hour days,
    /// 15 minutes of late forgiveness twice a quarter and typical
    /// charge rates.
    pub fn monthly_profile(salary: Decimal) -> EmployeeProfile {
        EmployeeProfile {
            employee_id: Uuid::new_v4(),
            name: Name().fake(),
            position: Some("Accountant".to_string()),
            department: Some("Finance".to_string()),
            contract_type: ContractType::Monthly,
            payment_method: PaymentMethod::BankTransfer,
            base_rate: Numeric::new(salary),
            scheduled_start: time(9, 0),
            scheduled_daily_hours: Numeric::new(dec!(8)),
            overtime_multiplier: Numeric::new(dec!(1.5)),
            late_forgiveness_minutes: 15,
            late_forgiveness_per_quarter: 2,
            absence_charge: Numeric::new(dec!(500)),
            late_charge: Numeric::new(dec!(200)),
            excess_leave_charge: Numeric::new(dec!(300)),
            leave_allowance_days: Numeric::new(dec!(2)),
        }
    }

    pub fn profile_with_contract(
        contract_type: ContractType,
        base_rate: Decimal,
    ) -> EmployeeProfile {
        let mut profile = Self::monthly_profile(base_rate);
        profile.contract_type = contract_type;
        profile
    }

    pub fn attendance_record(
        day: NaiveDate,
        status: RawAttendanceStatus,
        check_in: Option<NaiveTime>,
        check_out: Option<NaiveTime>,
    ) -> AttendanceRecord {
        AttendanceRecord {
            day,
            status,
            check_in,
            check_out,
        }
    }

    /// Employee payroll line with zeroed tallies and totals.
    pub fn employee_payroll_line(
        contract_type: ContractType,
        base_rate: Decimal,
    ) -> EmployeePayroll {
        let now = Utc::now();
        EmployeePayroll {
            id: Uuid::new_v4(),
            payroll_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            employee_name: Name().fake(),
            contract_type,
            position: None,
            department: None,
            payment_method: PaymentMethod::BankTransfer,
            base_rate: Numeric::new(base_rate),
            scheduled_daily_hours: Numeric::new(dec!(8)),
            overtime_multiplier: Numeric::new(dec!(1.5)),
            absence_charge: Numeric::new(dec!(500)),
            late_charge: Numeric::new(dec!(200)),
            excess_leave_charge: Numeric::new(dec!(300)),
            leave_allowance_days: Numeric::new(dec!(2)),
            worked_days: Numeric::ZERO,
            absent_days: Numeric::ZERO,
            late_days: Numeric::ZERO,
            leave_days: Numeric::ZERO,
            excess_leave_days: Numeric::ZERO,
            holiday_days: Numeric::ZERO,
            worked_hours: Numeric::ZERO,
            overtime_hours: Numeric::ZERO,
            overtime_pay: Numeric::ZERO,
            gross_pay: Numeric::ZERO,
            total_deductions: Numeric::ZERO,
            net_pay: Numeric::ZERO,
            version: 0,
            imported_at: now,
            updated_at: now,
        }
    }

    pub fn assignment(
        method: CalculationMethod,
        frequency: DeductionFrequency,
        priority: i64,
    ) -> EmployeeDeduction {
        let now = Utc::now();
        EmployeeDeduction {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            deduction_type_id: Uuid::new_v4(),
            method,
            percentage: None,
            amount: None,
            max_amount: None,
            frequency,
            priority,
            effective_from: date(2024, 1, 1),
            effective_to: None,
            is_active: true,
            total_deducted: Numeric::ZERO,
            deduction_count: 0,
            last_deduction_date: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deduction_row(
        employee_payroll_id: Uuid,
        category: DeductionCategory,
        amount: Decimal,
    ) -> PayrollDeduction {
        PayrollDeduction {
            id: Uuid::new_v4(),
            employee_payroll_id,
            category,
            label: category.to_string(),
            amount: Numeric::new(amount),
            deduction_type_id: None,
            loan_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn snapshot(
        employee_payroll_id: Uuid,
        day: NaiveDate,
        classification: DayClassification,
        worked_hours: Decimal,
        expected_hours: Decimal,
    ) -> AttendanceSnapshot {
        AttendanceSnapshot {
            id: Uuid::new_v4(),
            employee_payroll_id,
            day,
            classification,
            worked_hours: Numeric::new(worked_hours),
            expected_hours: Numeric::new(expected_hours),
            late_minutes: None,
            late_outcome: None,
            leave_type: None,
            updated_at: Utc::now(),
        }
    }

    pub fn holiday(payroll_id: Uuid, day: NaiveDate, paid: bool) -> PayrollPublicHoliday {
        PayrollPublicHoliday {
            id: Uuid::new_v4(),
            payroll_id,
            name: "Public Holiday".to_string(),
            start_day: day,
            end_day: day,
            paid,
            created_at: Utc::now(),
        }
    }
}
