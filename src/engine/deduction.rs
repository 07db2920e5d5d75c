use chrono::{Datelike, NaiveDate};
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::database::models::{CalculationMethod, DateRange, DeductionFrequency, EmployeeDeduction};
use crate::database::types::Numeric;

/// Pay figures a percentage deduction can be computed against. `net`
/// is the running net at the moment the deduction is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct DeductionBases {
    pub gross: Numeric,
    pub basic: Numeric,
    pub net: Numeric,
}

/// One recurring deduction realized against a payroll line.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDeduction {
    pub assignment_id: Uuid,
    pub deduction_type_id: Uuid,
    pub amount: Numeric,
}

/// Whether an assignment is due in the given period: active, inside its
/// effective window and not already taken for the current cycle.
pub fn should_apply_for_period(assignment: &EmployeeDeduction, period: &DateRange) -> bool {
    if !assignment.is_active {
        return false;
    }
    if assignment.effective_from > period.end {
        return false;
    }
    if let Some(effective_to) = assignment.effective_to {
        if effective_to < period.start {
            return false;
        }
    }
    is_due(assignment, period)
}

fn is_due(assignment: &EmployeeDeduction, period: &DateRange) -> bool {
    let anchor = period.start;
    match assignment.frequency {
        DeductionFrequency::PerPayroll => true,
        DeductionFrequency::OneTime => assignment.deduction_count == 0,
        DeductionFrequency::Monthly => assignment
            .last_deduction_date
            .map(|last| !same_month(last, anchor))
            .unwrap_or(true),
        DeductionFrequency::Quarterly => assignment
            .last_deduction_date
            .map(|last| !same_quarter(last, anchor))
            .unwrap_or(true),
        DeductionFrequency::SemiAnnual => assignment
            .last_deduction_date
            .map(|last| !same_half_year(last, anchor))
            .unwrap_or(true),
        DeductionFrequency::Annual => assignment
            .last_deduction_date
            .map(|last| last.year() != anchor.year())
            .unwrap_or(true),
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn same_quarter(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month0() / 3 == b.month0() / 3
}

fn same_half_year(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month0() / 6 == b.month0() / 6
}

/// Amount for one assignment against the given bases, rounded to cents
/// and clipped to the assignment's cap. Never negative.
pub fn deduction_amount(assignment: &EmployeeDeduction, bases: &DeductionBases) -> Numeric {
    let raw = match assignment.method {
        CalculationMethod::FixedAmount => assignment.amount.unwrap_or(Numeric::ZERO),
        CalculationMethod::PercentageOfGross => percent_of(bases.gross, assignment.percentage),
        CalculationMethod::PercentageOfBasic => percent_of(bases.basic, assignment.percentage),
        CalculationMethod::PercentageOfNet => percent_of(bases.net, assignment.percentage),
    };

    let rounded = raw.round2();
    let capped = match assignment.max_amount {
        Some(cap) => rounded.min(cap),
        None => rounded,
    };

    capped.max(Numeric::ZERO)
}

fn percent_of(base: Numeric, percentage: Option<Numeric>) -> Numeric {
    base * percentage.unwrap_or(Numeric::ZERO) / Numeric::new(dec!(100))
}

/// Evaluate the assignments due in the period sequentially, ascending
/// priority with assignment age as tie-breaker, carrying the running
/// net so later percentage-of-net deductions see earlier ones.
/// Non-positive amounts are skipped and nothing is recorded for them.
pub fn apply_in_priority_order(
    assignments: &[EmployeeDeduction],
    period: &DateRange,
    gross: Numeric,
    basic: Numeric,
    starting_net: Numeric,
) -> Vec<AppliedDeduction> {
    let mut ordered: Vec<&EmployeeDeduction> = assignments.iter().collect();
    ordered.sort_by_key(|a| (a.priority, a.created_at));

    let mut net = starting_net;
    let mut applied = Vec::new();

    for assignment in ordered {
        if !should_apply_for_period(assignment, period) {
            continue;
        }
        let amount = deduction_amount(
            assignment,
            &DeductionBases {
                gross,
                basic,
                net,
            },
        );
        if !amount.is_positive() {
            continue;
        }
        net -= amount;
        applied.push(AppliedDeduction {
            assignment_id: assignment.id,
            deduction_type_id: assignment.deduction_type_id,
            amount,
        });
    }

    applied
}
