pub mod attendance;
pub mod batch;
pub mod deduction;
pub mod employee;
pub mod employee_payroll;
pub mod loan;
pub mod macros;
pub mod payroll;

// Re-export all models for easy importing
pub use attendance::*;
pub use batch::*;
pub use deduction::*;
pub use employee::*;
pub use employee_payroll::*;
pub use loan::*;
pub use payroll::*;
