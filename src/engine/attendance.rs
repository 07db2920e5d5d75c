use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::database::models::{
    AttendanceRecord, AttendanceSnapshot, AttendanceTally, DayClassification, EmployeeProfile,
    LateOutcome, PayrollPublicHoliday, RawAttendanceStatus,
};
use crate::database::types::Numeric;

/// One calendar day after holiday, weekend and late-forgiveness rules
/// have been applied to the raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedDay {
    pub day: NaiveDate,
    pub classification: DayClassification,
    pub worked_hours: Numeric,
    pub expected_hours: Numeric,
    pub late_minutes: Option<i64>,
    pub late_outcome: Option<LateOutcome>,
    pub leave_type: Option<String>,
    /// `Some(paid)` when a public holiday covers the day.
    pub holiday_paid: Option<bool>,
}

/// Quarterly budget of forgivable late arrivals for one employee.
/// Seeded from already-persisted snapshots so the budget spans payroll
/// periods, then consumed in date order as days are classified.
#[derive(Debug, Clone)]
pub struct LateForgiveness {
    window_minutes: i64,
    per_quarter: i64,
    used: HashMap<(i32, u32), i64>,
}

impl LateForgiveness {
    pub fn new(window_minutes: i64, per_quarter: i64) -> Self {
        Self {
            window_minutes,
            per_quarter,
            used: HashMap::new(),
        }
    }

    pub fn seed(&mut self, year: i32, quarter: u32, already_used: i64) {
        self.used.insert((year, quarter), already_used);
    }

    pub fn assess(&mut self, day: NaiveDate, minutes_late: i64) -> LateOutcome {
        if minutes_late > self.window_minutes {
            return LateOutcome::Charged;
        }
        let used = self.used.entry(quarter_of(day)).or_insert(0);
        if *used < self.per_quarter {
            *used += 1;
            LateOutcome::Forgiven
        } else {
            LateOutcome::Charged
        }
    }
}

pub fn quarter_of(day: NaiveDate) -> (i32, u32) {
    (day.year(), day.month0() / 3 + 1)
}

pub fn quarter_start(day: NaiveDate) -> NaiveDate {
    let month = (quarter_of(day).1 - 1) * 3 + 1;
    NaiveDate::from_ymd_opt(day.year(), month, 1).unwrap_or(day)
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Hours between check-in and check-out, when both punches exist and
/// are ordered.
pub fn punch_hours(record: &AttendanceRecord) -> Option<Numeric> {
    match (record.check_in, record.check_out) {
        (Some(check_in), Some(check_out)) if check_out > check_in => {
            let minutes = (check_out - check_in).num_minutes();
            Some(Numeric::new(Decimal::from(minutes) / dec!(60)).round2())
        }
        _ => None,
    }
}

pub fn minutes_late(record: &AttendanceRecord, scheduled_start: NaiveTime) -> Option<i64> {
    record
        .check_in
        .map(|check_in| (check_in - scheduled_start).num_minutes().max(0))
}

/// Classify one day of the period. Precedence: public holiday, then
/// weekend, then the raw attendance status. A missing record on a
/// scheduled work day reads as an absence.
pub fn classify_day(
    day: NaiveDate,
    record: Option<&AttendanceRecord>,
    holiday: Option<&PayrollPublicHoliday>,
    profile: &EmployeeProfile,
    forgiveness: &mut LateForgiveness,
) -> ClassifiedDay {
    if let Some(holiday) = holiday {
        return off_day(day, record, DayClassification::PublicHoliday, Some(holiday.paid));
    }
    if is_weekend(day) {
        return off_day(day, record, DayClassification::Weekend, None);
    }

    let scheduled = profile.scheduled_daily_hours;
    let Some(record) = record else {
        return ClassifiedDay {
            day,
            classification: DayClassification::Absent,
            worked_hours: Numeric::ZERO,
            expected_hours: scheduled,
            late_minutes: None,
            late_outcome: None,
            leave_type: None,
            holiday_paid: None,
        };
    };

    match record.status {
        RawAttendanceStatus::Present => ClassifiedDay {
            day,
            classification: DayClassification::Present,
            worked_hours: punch_hours(record).unwrap_or(scheduled),
            expected_hours: scheduled,
            late_minutes: None,
            late_outcome: None,
            leave_type: None,
            holiday_paid: None,
        },
        RawAttendanceStatus::Late => {
            let minutes = minutes_late(record, profile.scheduled_start);
            let outcome = match minutes {
                Some(m) => forgiveness.assess(day, m),
                // A late flag without a check-in time cannot be checked
                // against the window.
                None => LateOutcome::Charged,
            };
            ClassifiedDay {
                day,
                classification: DayClassification::Late,
                worked_hours: punch_hours(record).unwrap_or(scheduled),
                expected_hours: scheduled,
                late_minutes: minutes,
                late_outcome: Some(outcome),
                leave_type: None,
                holiday_paid: None,
            }
        }
        RawAttendanceStatus::HalfDay => ClassifiedDay {
            day,
            classification: DayClassification::HalfDay,
            worked_hours: punch_hours(record)
                .unwrap_or_else(|| (scheduled / Numeric::from(2i64)).round2()),
            expected_hours: scheduled,
            late_minutes: None,
            late_outcome: None,
            leave_type: None,
            holiday_paid: None,
        },
        RawAttendanceStatus::Absent => ClassifiedDay {
            day,
            classification: DayClassification::Absent,
            worked_hours: Numeric::ZERO,
            expected_hours: scheduled,
            late_minutes: None,
            late_outcome: None,
            leave_type: None,
            holiday_paid: None,
        },
        RawAttendanceStatus::Leave => ClassifiedDay {
            day,
            classification: DayClassification::Leave,
            worked_hours: Numeric::ZERO,
            expected_hours: scheduled,
            late_minutes: None,
            late_outcome: None,
            leave_type: None,
            holiday_paid: None,
        },
    }
}

/// Off days carry no required presence, but punched hours still count
/// and later feed overtime.
fn off_day(
    day: NaiveDate,
    record: Option<&AttendanceRecord>,
    classification: DayClassification,
    holiday_paid: Option<bool>,
) -> ClassifiedDay {
    let worked_hours = record.and_then(punch_hours).unwrap_or(Numeric::ZERO);
    ClassifiedDay {
        day,
        classification,
        worked_hours,
        expected_hours: Numeric::ZERO,
        late_minutes: None,
        late_outcome: None,
        leave_type: None,
        holiday_paid,
    }
}

pub fn tally_days(days: &[ClassifiedDay]) -> AttendanceTally {
    let mut tally = AttendanceTally::default();
    for day in days {
        accumulate(
            &mut tally,
            day.classification,
            day.late_outcome,
            day.worked_hours,
            day.holiday_paid.unwrap_or(false),
        );
    }
    tally
}

/// Recompute the tally from persisted snapshot rows, resolving the paid
/// flag of holiday days from the payroll's holiday table.
pub fn tally_snapshots(
    snapshots: &[AttendanceSnapshot],
    holidays: &[PayrollPublicHoliday],
) -> AttendanceTally {
    let mut tally = AttendanceTally::default();
    for snapshot in snapshots {
        let holiday_paid = holidays
            .iter()
            .find(|h| h.covers(snapshot.day))
            .map(|h| h.paid)
            .unwrap_or(false);
        accumulate(
            &mut tally,
            snapshot.classification,
            snapshot.late_outcome,
            snapshot.worked_hours,
            holiday_paid,
        );
    }
    tally
}

fn accumulate(
    tally: &mut AttendanceTally,
    classification: DayClassification,
    late_outcome: Option<LateOutcome>,
    worked_hours: Numeric,
    holiday_paid: bool,
) {
    let one = Numeric::from(1i64);
    let half = Numeric::new(dec!(0.5));

    match classification {
        DayClassification::Present => {
            tally.worked_days += one;
            tally.worked_hours += worked_hours;
        }
        DayClassification::Late => {
            tally.worked_days += one;
            tally.worked_hours += worked_hours;
            if late_outcome == Some(LateOutcome::Charged) {
                tally.late_days += one;
            }
        }
        DayClassification::HalfDay => {
            tally.worked_days += half;
            tally.absent_days += half;
            tally.worked_hours += worked_hours;
        }
        DayClassification::Absent => {
            tally.absent_days += one;
        }
        DayClassification::Leave => {
            tally.leave_days += one;
        }
        DayClassification::PublicHoliday => {
            // A paid holiday counts as an attended day with no required
            // presence.
            if holiday_paid {
                tally.holiday_days += one;
            }
            tally.worked_hours += worked_hours;
        }
        DayClassification::Weekend => {
            tally.worked_hours += worked_hours;
        }
    }
}

/// Overtime is everything worked beyond the expected hours of each day,
/// summed across the period.
pub fn overtime_hours(snapshots: &[AttendanceSnapshot]) -> Numeric {
    snapshots
        .iter()
        .map(|s| (s.worked_hours - s.expected_hours).max(Numeric::ZERO))
        .sum()
}
