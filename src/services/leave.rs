use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::database::models::{
    DateRange, DayClassification, NewAttendanceSnapshot, Payroll, PayrollStatus,
};
use crate::database::repositories::{
    AttendanceSnapshotRepository, EmployeePayrollRepository, PayrollRepository,
};
use crate::database::types::Numeric;
use crate::engine::attendance::{overtime_hours, tally_snapshots};
use crate::engine::totals;
use crate::error::AppError;
use crate::services::sources::{LeaveSource, NotificationSink};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    LeaveOverlapsWorkedDay,
    LeaveExceedsAllowance,
    OvertimeAboveDailyCap,
}

/// Something a reviewer should look at before finalizing the stage.
/// Anomalies never block processing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAnomaly {
    pub employee_payroll_id: Uuid,
    pub day: Option<NaiveDate>,
    pub kind: AnomalyKind,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub payroll_id: Uuid,
    pub reclassified_days: usize,
    pub anomalies: Vec<ReviewAnomaly>,
}

#[derive(Clone)]
pub struct LeaveReviewService {
    config: Config,
    payrolls: PayrollRepository,
    employee_payrolls: EmployeePayrollRepository,
    snapshots: AttendanceSnapshotRepository,
    leave: Arc<dyn LeaveSource>,
    notifier: Arc<dyn NotificationSink>,
}

impl LeaveReviewService {
    pub fn new(
        config: Config,
        payrolls: PayrollRepository,
        employee_payrolls: EmployeePayrollRepository,
        snapshots: AttendanceSnapshotRepository,
        leave: Arc<dyn LeaveSource>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            payrolls,
            employee_payrolls,
            snapshots,
            leave,
            notifier,
        }
    }

    /// Reconcile approved leave against the imported snapshots:
    /// absences covered by leave become leave days, worked days covered
    /// by leave become anomalies, and every line's tally is recounted.
    /// Re-runnable until the leave stage is finalized.
    pub async fn process_leave_review(&self, payroll_id: Uuid) -> Result<ReviewReport> {
        let payroll = self
            .payrolls
            .find_by_id(payroll_id)
            .await?
            .ok_or_else(|| AppError::not_found("payroll", payroll_id))?;
        ensure_leave_reviewable(&payroll)?;

        let period = payroll.period();
        let holidays = self.payrolls.list_holidays(payroll.id).await?;
        let lines = self.employee_payrolls.list_for_payroll(payroll.id).await?;

        let now = Utc::now();
        let mut reclassified_days = 0usize;
        let mut anomalies = Vec::new();

        for line in &lines {
            let leaves = self
                .leave
                .fetch_approved_leave(line.employee_id, &period)
                .await?;

            let snapshots = self.snapshots.list_for_employee_payroll(line.id).await?;
            let by_day: HashMap<_, _> = snapshots.iter().map(|s| (s.day, s)).collect();

            for leave in &leaves {
                let start = leave.start_day.max(period.start);
                let end = leave.end_day.min(period.end);
                if start > end {
                    continue;
                }

                for day in DateRange::new(start, end).days() {
                    let Some(snapshot) = by_day.get(&day) else {
                        continue;
                    };
                    match snapshot.classification {
                        DayClassification::Absent => {
                            self.snapshots
                                .upsert(
                                    &NewAttendanceSnapshot {
                                        employee_payroll_id: line.id,
                                        day,
                                        classification: DayClassification::Leave,
                                        worked_hours: Numeric::ZERO,
                                        expected_hours: snapshot.expected_hours,
                                        late_minutes: None,
                                        late_outcome: None,
                                        leave_type: Some(leave.leave_type.clone()),
                                    },
                                    now,
                                )
                                .await?;
                            reclassified_days += 1;
                        }
                        DayClassification::Present
                        | DayClassification::Late
                        | DayClassification::HalfDay => {
                            anomalies.push(ReviewAnomaly {
                                employee_payroll_id: line.id,
                                day: Some(day),
                                kind: AnomalyKind::LeaveOverlapsWorkedDay,
                                detail: format!(
                                    "approved {} leave overlaps a {} day",
                                    leave.leave_type, snapshot.classification
                                ),
                            });
                        }
                        DayClassification::Leave
                        | DayClassification::PublicHoliday
                        | DayClassification::Weekend => {}
                    }
                }
            }

            // Recount from what is now persisted.
            let snapshots = self.snapshots.list_for_employee_payroll(line.id).await?;
            let tally = tally_snapshots(&snapshots, &holidays);
            let excess = totals::excess_leave_days(tally.leave_days, line.leave_allowance_days);
            if excess.is_positive() {
                anomalies.push(ReviewAnomaly {
                    employee_payroll_id: line.id,
                    day: None,
                    kind: AnomalyKind::LeaveExceedsAllowance,
                    detail: format!(
                        "{} leave day(s) against an allowance of {}",
                        tally.leave_days, line.leave_allowance_days
                    ),
                });
            }
            self.employee_payrolls
                .update_tally(line, &tally, excess)
                .await?;
        }

        if !anomalies.is_empty() {
            match self
                .notifier
                .notify_issues_found(payroll.id, anomalies.len())
                .await
            {
                Ok(()) => {
                    self.payrolls.mark_leave_notified(&payroll).await?;
                }
                Err(e) => {
                    log::warn!("Payroll {} leave review notice failed: {}", payroll.id, e);
                }
            }
        }

        log::info!(
            "Payroll {} leave review: {} day(s) reclassified, {} anomaly(ies)",
            payroll.id,
            reclassified_days,
            anomalies.len()
        );

        Ok(ReviewReport {
            payroll_id: payroll.id,
            reclassified_days,
            anomalies,
        })
    }

    /// Derive overtime hours from the snapshots, price them at the
    /// frozen terms and store them on each line. Days above the daily
    /// cap are flagged, not clipped.
    pub async fn process_overtime_review(&self, payroll_id: Uuid) -> Result<ReviewReport> {
        let payroll = self
            .payrolls
            .find_by_id(payroll_id)
            .await?
            .ok_or_else(|| AppError::not_found("payroll", payroll_id))?;
        ensure_overtime_reviewable(&payroll)?;

        let daily_cap = Numeric::from(self.config.overtime_daily_cap_hours);
        let lines = self.employee_payrolls.list_for_payroll(payroll.id).await?;
        let mut anomalies = Vec::new();

        for line in &lines {
            let snapshots = self.snapshots.list_for_employee_payroll(line.id).await?;

            for snapshot in &snapshots {
                let beyond = snapshot.worked_hours - snapshot.expected_hours;
                if beyond > daily_cap {
                    anomalies.push(ReviewAnomaly {
                        employee_payroll_id: line.id,
                        day: Some(snapshot.day),
                        kind: AnomalyKind::OvertimeAboveDailyCap,
                        detail: format!(
                            "{} overtime hour(s) exceed the daily cap of {}",
                            beyond, daily_cap
                        ),
                    });
                }
            }

            let hours = overtime_hours(&snapshots);
            let pay = totals::overtime_pay(line, hours);
            self.employee_payrolls
                .update_overtime(line, hours, pay)
                .await?;
        }

        if !anomalies.is_empty() {
            log::warn!(
                "Payroll {} overtime review flagged {} day(s) above the cap",
                payroll.id,
                anomalies.len()
            );
        }

        Ok(ReviewReport {
            payroll_id: payroll.id,
            reclassified_days: 0,
            anomalies,
        })
    }
}

fn ensure_leave_reviewable(payroll: &Payroll) -> Result<()> {
    if payroll.leave_finalized {
        return Err(AppError::state_conflict(format!(
            "payroll {} leave review is already finalized",
            payroll.id
        ))
        .into());
    }
    if payroll.status != PayrollStatus::LeaveReview {
        return Err(AppError::state_conflict(format!(
            "payroll {} is not in leave review (status {})",
            payroll.id, payroll.status
        ))
        .into());
    }
    Ok(())
}

fn ensure_overtime_reviewable(payroll: &Payroll) -> Result<()> {
    if payroll.status != PayrollStatus::OvertimeReview {
        return Err(AppError::state_conflict(format!(
            "payroll {} is not in overtime review (status {})",
            payroll.id, payroll.status
        ))
        .into());
    }
    Ok(())
}
