use anyhow::Result;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::database::models::{
    CalculationMethod, DeductionType, DeductionTypeInput, EmployeeDeduction,
    EmployeeDeductionInput,
};
use crate::database::repositories::DeductionRepository;
use crate::database::types::Numeric;
use crate::error::AppError;

/// Manages the deduction catalog and per-employee assignments. Amounts
/// are only ever taken from an assignment when a payroll is confirmed.
#[derive(Clone)]
pub struct DeductionService {
    deductions: DeductionRepository,
}

impl DeductionService {
    pub fn new(deductions: DeductionRepository) -> Self {
        Self { deductions }
    }

    pub async fn create_type(&self, input: &DeductionTypeInput) -> Result<DeductionType> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("deduction type name cannot be empty").into());
        }
        self.deductions.create_type(input).await
    }

    pub async fn get_type(&self, type_id: Uuid) -> Result<DeductionType> {
        let deduction_type = self
            .deductions
            .find_type(type_id)
            .await?
            .ok_or_else(|| AppError::not_found("deduction type", type_id))?;
        Ok(deduction_type)
    }

    pub async fn list_types(&self, site_id: Option<Uuid>) -> Result<Vec<DeductionType>> {
        self.deductions.list_types(site_id).await
    }

    /// Attach a deduction to an employee. The configuration must be
    /// complete for its calculation method before anything is persisted.
    pub async fn assign(&self, input: &EmployeeDeductionInput) -> Result<EmployeeDeduction> {
        self.get_type(input.deduction_type_id).await?;

        match input.method {
            CalculationMethod::FixedAmount => match input.amount {
                Some(amount) if amount.is_positive() => {}
                _ => {
                    return Err(AppError::validation(
                        "fixed amount deductions require a positive amount",
                    )
                    .into());
                }
            },
            CalculationMethod::PercentageOfGross
            | CalculationMethod::PercentageOfBasic
            | CalculationMethod::PercentageOfNet => match input.percentage {
                Some(p) if p > Numeric::ZERO && p <= Numeric::new(dec!(100)) => {}
                _ => {
                    return Err(AppError::validation(
                        "percentage deductions require a percentage between 0 and 100",
                    )
                    .into());
                }
            },
        }
        if let Some(max) = input.max_amount {
            if !max.is_positive() {
                return Err(AppError::validation("maximum amount must be positive").into());
            }
        }
        if let Some(until) = input.effective_to {
            if until < input.effective_from {
                return Err(AppError::validation(
                    "effective end cannot precede the effective start",
                )
                .into());
            }
        }

        let assignment = self.deductions.assign(input).await?;
        log::info!(
            "Assigned deduction type {} to employee {} ({}, priority {})",
            assignment.deduction_type_id,
            assignment.employee_id,
            assignment.method,
            assignment.priority
        );
        Ok(assignment)
    }

    pub async fn get_assignment(&self, assignment_id: Uuid) -> Result<EmployeeDeduction> {
        let assignment = self
            .deductions
            .find_assignment(assignment_id)
            .await?
            .ok_or_else(|| AppError::not_found("deduction assignment", assignment_id))?;
        Ok(assignment)
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> Result<Vec<EmployeeDeduction>> {
        self.deductions.list_for_employee(employee_id).await
    }

    pub async fn set_active(&self, assignment_id: Uuid, active: bool) -> Result<EmployeeDeduction> {
        let assignment = self.get_assignment(assignment_id).await?;
        self.deductions.set_active(&assignment, active).await
    }
}
