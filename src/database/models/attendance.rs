use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::database::types::Numeric;

/// Attendance status exactly as the external attendance system reports
/// it, before holiday and weekend precedence is applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RawAttendanceStatus {
    Present,
    Late,
    Absent,
    HalfDay,
    Leave,
}

/// One day of attendance as fetched from the external source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub day: NaiveDate,
    pub status: RawAttendanceStatus,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
}

/// An approved leave request overlapping a payroll period, as reported
/// by the external leave system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedLeave {
    pub leave_type: String,
    pub start_day: NaiveDate,
    pub end_day: NaiveDate,
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum DayClassification {
        Present => "present",
        Late => "late",
        Absent => "absent",
        HalfDay => "half_day",
        Leave => "leave",
        PublicHoliday => "public_holiday",
        Weekend => "weekend",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "snake_case")]
    pub enum LateOutcome {
        Forgiven => "forgiven",
        Charged => "charged",
    }
}

/// Immutable per-day record the import writes for one employee. Keyed by
/// `(employee_payroll_id, day)`, so re-imports overwrite in place.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSnapshot {
    pub id: Uuid,
    pub employee_payroll_id: Uuid,
    pub day: NaiveDate,
    pub classification: DayClassification,
    pub worked_hours: Numeric,
    pub expected_hours: Numeric,
    pub late_minutes: Option<i64>,
    pub late_outcome: Option<LateOutcome>,
    pub leave_type: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAttendanceSnapshot {
    pub employee_payroll_id: Uuid,
    pub day: NaiveDate,
    pub classification: DayClassification,
    pub worked_hours: Numeric,
    pub expected_hours: Numeric,
    pub late_minutes: Option<i64>,
    pub late_outcome: Option<LateOutcome>,
    pub leave_type: Option<String>,
}
