use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::database::models::{ApprovedLeave, AttendanceRecord, DateRange, EmployeeProfile};

/// External attendance system. One call per employee and period; the
/// importer never retries on its own.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn fetch_attendance(
        &self,
        employee_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<AttendanceRecord>>;
}

/// External leave system. Only approved requests are relevant here;
/// pending ones never reach payroll.
#[async_trait]
pub trait LeaveSource: Send + Sync {
    async fn fetch_approved_leave(
        &self,
        employee_id: Uuid,
        range: &DateRange,
    ) -> Result<Vec<ApprovedLeave>>;
}

/// Read-only view of the employee directory. The profiles returned here
/// are frozen onto the payroll at import time.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn active_employees(&self, range: &DateRange) -> Result<Vec<EmployeeProfile>>;
}

/// Outbound notices to HR. Callers log and swallow failures; a dead
/// notification channel must never block a payroll.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_issues_found(&self, payroll_id: Uuid, issue_count: usize) -> Result<()>;

    async fn notify_finalized(&self, payroll_id: Uuid, stage: &str, actor: Uuid) -> Result<()>;
}

/// Default sink that only writes to the application log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify_issues_found(&self, payroll_id: Uuid, issue_count: usize) -> Result<()> {
        log::info!(
            "Payroll {} review found {} issue(s) needing attention",
            payroll_id,
            issue_count
        );
        Ok(())
    }

    async fn notify_finalized(&self, payroll_id: Uuid, stage: &str, actor: Uuid) -> Result<()> {
        log::info!("Payroll {} {} finalized by {}", payroll_id, stage, actor);
        Ok(())
    }
}
