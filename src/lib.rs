pub mod config;
pub mod database;
pub mod engine;
pub mod error;
pub mod services;

#[cfg(test)]
pub mod test_utils;

use std::sync::Arc;

use sqlx::SqlitePool;

pub use config::Config;
pub use error::AppError;

use database::repositories::{
    AttendanceSnapshotRepository, DeductionRepository, EmployeePayrollRepository, LoanRepository,
    PayrollBatchRepository, PayrollDeductionRepository, PayrollRepository,
};
use services::{
    AttendanceImportService, AttendanceSource, DeductionService, EmployeeDirectory,
    LeaveReviewService, LeaveSource, LoanService, NotificationSink, PaymentBatchService,
    PayrollLifecycleService,
};

/// The external systems payroll reads from and reports to.
#[derive(Clone)]
pub struct ExternalSources {
    pub attendance: Arc<dyn AttendanceSource>,
    pub leave: Arc<dyn LeaveSource>,
    pub directory: Arc<dyn EmployeeDirectory>,
    pub notifier: Arc<dyn NotificationSink>,
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: PayrollLifecycleService,
    pub import: AttendanceImportService,
    pub leave_review: LeaveReviewService,
    pub loans: LoanService,
    pub deductions: DeductionService,
    pub batches: PaymentBatchService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config, sources: ExternalSources) -> Self {
        let payrolls = PayrollRepository::new(pool.clone());
        let employee_payrolls = EmployeePayrollRepository::new(pool.clone());
        let snapshots = AttendanceSnapshotRepository::new(pool.clone());
        let deductions = DeductionRepository::new(pool.clone());
        let payroll_deductions = PayrollDeductionRepository::new(pool.clone());
        let loans = LoanRepository::new(pool.clone());
        let payroll_batches = PayrollBatchRepository::new(pool.clone());

        let batches = PaymentBatchService::new(payroll_batches);
        let lifecycle = PayrollLifecycleService::new(
            pool,
            payrolls.clone(),
            employee_payrolls.clone(),
            payroll_deductions,
            deductions.clone(),
            loans.clone(),
            batches.clone(),
            sources.notifier.clone(),
        );
        let import = AttendanceImportService::new(
            config.clone(),
            payrolls.clone(),
            employee_payrolls.clone(),
            snapshots.clone(),
            sources.attendance,
            sources.directory,
            sources.notifier.clone(),
        );
        let leave_review = LeaveReviewService::new(
            config,
            payrolls,
            employee_payrolls,
            snapshots,
            sources.leave,
            sources.notifier,
        );

        Self {
            lifecycle,
            import,
            leave_review,
            loans: LoanService::new(loans),
            deductions: DeductionService::new(deductions),
            batches,
        }
    }
}
