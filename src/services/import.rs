use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{
    AttendanceTally, EmployeeProfile, NewAttendanceSnapshot, NewEmployeePayroll, Payroll,
    PayrollPublicHoliday, PayrollStatus,
};
use crate::database::repositories::{
    AttendanceSnapshotRepository, EmployeePayrollRepository, PayrollRepository,
};
use crate::engine::attendance::{
    classify_day, quarter_of, quarter_start, tally_days, ClassifiedDay, LateForgiveness,
};
use crate::error::{AppError, ImportFailure};
use crate::services::sources::{AttendanceSource, EmployeeDirectory, NotificationSink};

/// Outcome of one import run. Failed employees are listed, not fatal,
/// as long as at least one line imported.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub payroll_id: Uuid,
    pub imported: usize,
    pub failures: Vec<ImportFailure>,
    pub import_count: i64,
}

struct EmployeeImport {
    profile: EmployeeProfile,
    tally: AttendanceTally,
    days: Vec<ClassifiedDay>,
}

#[derive(Clone)]
pub struct AttendanceImportService {
    config: Config,
    payrolls: PayrollRepository,
    employee_payrolls: EmployeePayrollRepository,
    snapshots: AttendanceSnapshotRepository,
    attendance: Arc<dyn AttendanceSource>,
    directory: Arc<dyn EmployeeDirectory>,
    notifier: Arc<dyn NotificationSink>,
}

impl AttendanceImportService {
    pub fn new(
        config: Config,
        payrolls: PayrollRepository,
        employee_payrolls: EmployeePayrollRepository,
        snapshots: AttendanceSnapshotRepository,
        attendance: Arc<dyn AttendanceSource>,
        directory: Arc<dyn EmployeeDirectory>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            payrolls,
            employee_payrolls,
            snapshots,
            attendance,
            directory,
            notifier,
        }
    }

    /// Run one full import over the payroll period. Re-running replaces
    /// every snapshot and recomputes every tally, so the result is the
    /// same as a from-scratch import.
    pub async fn import_attendance(&self, payroll_id: Uuid) -> Result<ImportReport> {
        let payroll = self
            .payrolls
            .find_by_id(payroll_id)
            .await?
            .ok_or_else(|| AppError::not_found("payroll", payroll_id))?;
        ensure_importable(&payroll)?;

        let holidays = self.payrolls.list_holidays(payroll.id).await?;
        let profiles = self.directory.active_employees(&payroll.period()).await?;

        // Fetch and classify concurrently, a bounded chunk at a time.
        let mut outcomes = Vec::with_capacity(profiles.len());
        for chunk in profiles.chunks(self.config.import_concurrency.max(1)) {
            let batch = join_all(
                chunk
                    .iter()
                    .map(|profile| self.classify_employee(&payroll, &holidays, profile)),
            )
            .await;
            outcomes.extend(batch);
        }

        // Writes are sequential and share one timestamp.
        let now = Utc::now();
        let mut imported = 0usize;
        let mut failures = Vec::new();

        for outcome in outcomes {
            match outcome {
                Ok(import) => {
                    let line = self
                        .employee_payrolls
                        .upsert(
                            &NewEmployeePayroll {
                                payroll_id: payroll.id,
                                profile: import.profile,
                                tally: import.tally,
                            },
                            now,
                        )
                        .await?;

                    for day in &import.days {
                        self.snapshots
                            .upsert(
                                &NewAttendanceSnapshot {
                                    employee_payroll_id: line.id,
                                    day: day.day,
                                    classification: day.classification,
                                    worked_hours: day.worked_hours,
                                    expected_hours: day.expected_hours,
                                    late_minutes: day.late_minutes,
                                    late_outcome: day.late_outcome,
                                    leave_type: day.leave_type.clone(),
                                },
                                now,
                            )
                            .await?;
                    }
                    imported += 1;
                }
                Err(failure) => failures.push(failure),
            }
        }

        if imported == 0 {
            if !failures.is_empty() {
                return Err(AppError::PartialImportFailure { failures }.into());
            }
            log::warn!("Payroll {} import found no active employees", payroll.id);
            return Ok(ImportReport {
                payroll_id: payroll.id,
                imported: 0,
                failures,
                import_count: payroll.import_count,
            });
        }

        let employee_count = self.employee_payrolls.list_for_payroll(payroll.id).await?.len() as i64;
        let next_status = match payroll.status {
            PayrollStatus::PublicHolidaysReview => PayrollStatus::AttendanceImport,
            status => status,
        };
        let mut updated = self
            .payrolls
            .record_import(&payroll, next_status, employee_count, now)
            .await?;

        log::info!(
            "Payroll {} import #{}: {} employee(s) imported, {} failed",
            payroll.id,
            updated.import_count,
            imported,
            failures.len()
        );

        // Partial failures go out as a notice; a dead channel only logs.
        if !failures.is_empty() {
            match self
                .notifier
                .notify_issues_found(payroll.id, failures.len())
                .await
            {
                Ok(()) => updated = self.payrolls.mark_attendance_notified(&updated).await?,
                Err(e) => {
                    log::warn!("Payroll {} import notice failed: {}", payroll.id, e);
                }
            }
        }

        Ok(ImportReport {
            payroll_id: payroll.id,
            imported,
            failures,
            import_count: updated.import_count,
        })
    }

    /// Fetch and classify one employee's period. Any failure here skips
    /// just this employee and lands in the run report.
    async fn classify_employee(
        &self,
        payroll: &Payroll,
        holidays: &[PayrollPublicHoliday],
        profile: &EmployeeProfile,
    ) -> std::result::Result<EmployeeImport, ImportFailure> {
        let fail = |reason: String| ImportFailure {
            employee_id: profile.employee_id,
            reason,
        };

        if !profile.scheduled_daily_hours.is_positive() {
            return Err(fail("scheduled daily hours must be positive".to_string()));
        }

        let period = payroll.period();
        let mut forgiveness = LateForgiveness::new(
            profile.late_forgiveness_minutes,
            profile.late_forgiveness_per_quarter,
        );

        // Forgiveness already granted earlier in the quarter, in other
        // payrolls, counts against the budget here.
        let mut seeded: HashSet<(i32, u32)> = HashSet::new();
        for day in period.days() {
            let (year, quarter) = quarter_of(day);
            if !seeded.insert((year, quarter)) {
                continue;
            }
            let from = quarter_start(day);
            if from < period.start {
                let used = self
                    .snapshots
                    .count_forgiven_lates(profile.employee_id, from, period.start)
                    .await
                    .map_err(|e| fail(e.to_string()))?;
                forgiveness.seed(year, quarter, used);
            }
        }

        let records = self
            .attendance
            .fetch_attendance(profile.employee_id, &period)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let by_day: HashMap<_, _> = records.into_iter().map(|r| (r.day, r)).collect();

        let days: Vec<ClassifiedDay> = period
            .days()
            .map(|day| {
                let holiday = holidays.iter().find(|h| h.covers(day));
                classify_day(day, by_day.get(&day), holiday, profile, &mut forgiveness)
            })
            .collect();

        Ok(EmployeeImport {
            profile: profile.clone(),
            tally: tally_days(&days),
            days,
        })
    }
}

fn ensure_importable(payroll: &Payroll) -> Result<()> {
    if payroll.attendance_finalized {
        return Err(AppError::state_conflict(format!(
            "payroll {} attendance is already finalized",
            payroll.id
        ))
        .into());
    }
    match payroll.status {
        PayrollStatus::PublicHolidaysReview | PayrollStatus::AttendanceImport => Ok(()),
        status => Err(AppError::state_conflict(format!(
            "payroll {} cannot import attendance in status {}",
            payroll.id, status
        ))
        .into()),
    }
}
