use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::database::types::Numeric;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum PayrollStatus {
        PublicHolidaysReview => "public_holidays_review",
        AttendanceImport => "attendance_import",
        LeaveReview => "leave_review",
        OvertimeReview => "overtime_review",
        ConfirmedAndLocked => "confirmed_and_locked",
        PendingFinanceReview => "pending_finance_review",
        Paid => "paid",
    }
}

impl PayrollStatus {
    /// The only legal successor of each stage. The lifecycle is strictly
    /// linear and never moves backwards.
    pub fn next(self) -> Option<PayrollStatus> {
        match self {
            PayrollStatus::PublicHolidaysReview => Some(PayrollStatus::AttendanceImport),
            PayrollStatus::AttendanceImport => Some(PayrollStatus::LeaveReview),
            PayrollStatus::LeaveReview => Some(PayrollStatus::OvertimeReview),
            PayrollStatus::OvertimeReview => Some(PayrollStatus::ConfirmedAndLocked),
            PayrollStatus::ConfirmedAndLocked => Some(PayrollStatus::PendingFinanceReview),
            PayrollStatus::PendingFinanceReview => Some(PayrollStatus::Paid),
            PayrollStatus::Paid => None,
        }
    }

    pub fn can_transition_to(self, target: PayrollStatus) -> bool {
        self.next() == Some(target)
    }

    /// Attendance, leave and deduction data may no longer change once a
    /// payroll reaches this point.
    pub fn is_locked(self) -> bool {
        matches!(
            self,
            PayrollStatus::ConfirmedAndLocked
                | PayrollStatus::PendingFinanceReview
                | PayrollStatus::Paid
        )
    }
}

/// Inclusive calendar range of a payroll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn day_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: PayrollStatus,
    pub overlap_override: bool,
    pub overlap_reason: Option<String>,
    pub total_gross: Numeric,
    pub total_deductions: Numeric,
    pub total_net: Numeric,
    pub employee_count: i64,
    pub import_count: i64,
    pub last_imported_at: Option<DateTime<Utc>>,
    pub attendance_finalized: bool,
    pub attendance_finalized_by: Option<Uuid>,
    pub attendance_finalized_at: Option<DateTime<Utc>>,
    pub attendance_notified: bool,
    pub leave_finalized: bool,
    pub leave_finalized_by: Option<Uuid>,
    pub leave_finalized_at: Option<DateTime<Utc>>,
    pub leave_notified: bool,
    pub overtime_finalized: bool,
    pub overtime_finalized_by: Option<Uuid>,
    pub overtime_finalized_at: Option<DateTime<Utc>>,
    pub payment_source: Option<String>,
    pub sent_to_finance_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payroll {
    pub fn period(&self) -> DateRange {
        DateRange::new(self.period_start, self.period_end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayrollInput {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[serde(default)]
    pub overlap_override: bool,
    pub overlap_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollPublicHoliday {
    pub id: Uuid,
    pub payroll_id: Uuid,
    pub name: String,
    pub start_day: NaiveDate,
    pub end_day: NaiveDate,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl PayrollPublicHoliday {
    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_day <= day && day <= self.end_day
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHolidayInput {
    pub name: String,
    pub start_day: NaiveDate,
    pub end_day: NaiveDate,
    pub paid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_is_linear_and_terminal() {
        let mut status = PayrollStatus::PublicHolidaysReview;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            seen.push(next);
            status = next;
        }
        assert_eq!(
            seen,
            vec![
                PayrollStatus::PublicHolidaysReview,
                PayrollStatus::AttendanceImport,
                PayrollStatus::LeaveReview,
                PayrollStatus::OvertimeReview,
                PayrollStatus::ConfirmedAndLocked,
                PayrollStatus::PendingFinanceReview,
                PayrollStatus::Paid,
            ]
        );
        assert_eq!(PayrollStatus::Paid.next(), None);
    }

    #[test]
    fn transitions_allow_only_the_immediate_successor() {
        assert!(
            PayrollStatus::LeaveReview.can_transition_to(PayrollStatus::OvertimeReview)
        );
        assert!(!PayrollStatus::LeaveReview.can_transition_to(PayrollStatus::Paid));
        assert!(
            !PayrollStatus::OvertimeReview.can_transition_to(PayrollStatus::LeaveReview)
        );
        assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::PublicHolidaysReview));
    }

    #[test]
    fn date_range_overlap_is_inclusive() {
        let january = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        );
        let touching = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 27).unwrap(),
        );
        let february = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
        );
        assert!(january.overlaps(&touching));
        assert!(!january.overlaps(&february));
        assert_eq!(january.day_count(), 31);
        assert_eq!(january.days().count(), 31);
    }
}
