pub mod batches;
pub mod deductions;
pub mod import;
pub mod leave;
pub mod lifecycle;
pub mod loans;
pub mod sources;

pub use batches::PaymentBatchService;
pub use deductions::DeductionService;
pub use import::{AttendanceImportService, ImportReport};
pub use leave::{AnomalyKind, LeaveReviewService, ReviewAnomaly, ReviewReport};
pub use lifecycle::PayrollLifecycleService;
pub use loans::LoanService;
pub use sources::{
    AttendanceSource, EmployeeDirectory, LeaveSource, LogNotifier, NotificationSink,
};
