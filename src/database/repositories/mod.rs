pub mod attendance_snapshot;
pub mod deduction;
pub mod employee_payroll;
pub mod loan;
pub mod payroll;
pub mod payroll_batch;
pub mod payroll_deduction;

// Re-export all repositories for easy importing
pub use attendance_snapshot::AttendanceSnapshotRepository;
pub use deduction::DeductionRepository;
pub use employee_payroll::EmployeePayrollRepository;
pub use loan::LoanRepository;
pub use payroll::PayrollRepository;
pub use payroll_batch::PayrollBatchRepository;
pub use payroll_deduction::PayrollDeductionRepository;
