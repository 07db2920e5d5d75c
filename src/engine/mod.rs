pub mod amortization;
pub mod attendance;
pub mod deduction;
pub mod totals;
