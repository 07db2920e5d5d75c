use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Loan, LoanInput, LoanPayment, LoanStatus};
use crate::database::repositories::LoanRepository;
use crate::database::types::Numeric;
use crate::engine::amortization;
use crate::error::AppError;

/// Employee loan management. Installments themselves are taken when a
/// payroll is confirmed; this service covers the request and approval
/// side plus out-of-band repayments.
#[derive(Clone)]
pub struct LoanService {
    loans: LoanRepository,
}

impl LoanService {
    pub fn new(loans: LoanRepository) -> Self {
        Self { loans }
    }

    /// Validate and persist a loan request. The installment is fixed
    /// here from the terms and never recomputed afterwards.
    pub async fn create_loan(&self, input: &LoanInput) -> Result<Loan> {
        if !input.principal.is_positive() {
            return Err(AppError::validation("loan principal must be positive").into());
        }
        if input.term_months < 1 {
            return Err(AppError::validation("loan term must be at least one month").into());
        }
        if let Some(rate) = input.annual_interest_rate {
            if rate < Numeric::ZERO {
                return Err(
                    AppError::validation("annual interest rate cannot be negative").into(),
                );
            }
        }

        let installment = amortization::monthly_installment(
            input.principal,
            input.term_months,
            input.annual_interest_rate,
        );
        let loan = self.loans.create(input, installment).await?;
        log::info!(
            "Loan {} requested for employee {}: principal {}, {} monthly installments of {}",
            loan.id,
            loan.employee_id,
            loan.principal,
            loan.term_months,
            loan.monthly_installment
        );
        Ok(loan)
    }

    pub async fn get_loan(&self, loan_id: Uuid) -> Result<Loan> {
        let loan = self
            .loans
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found("loan", loan_id))?;
        Ok(loan)
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> Result<Vec<Loan>> {
        self.loans.list_for_employee(employee_id).await
    }

    pub async fn list_payments(&self, loan_id: Uuid) -> Result<Vec<LoanPayment>> {
        let loan = self.get_loan(loan_id).await?;
        self.loans.list_payments(loan.id).await
    }

    pub async fn approve(&self, loan_id: Uuid, approver: Uuid) -> Result<Loan> {
        let loan = self.get_loan(loan_id).await?;
        self.ensure_status(&loan, LoanStatus::Pending, "approved")?;
        self.loans.approve(&loan, approver, Utc::now()).await
    }

    /// An approved loan starts taking installments only once activated.
    pub async fn activate(&self, loan_id: Uuid) -> Result<Loan> {
        let loan = self.get_loan(loan_id).await?;
        self.ensure_status(&loan, LoanStatus::Approved, "activated")?;
        self.loans.activate(&loan, Utc::now()).await
    }

    pub async fn reject(&self, loan_id: Uuid) -> Result<Loan> {
        let loan = self.get_loan(loan_id).await?;
        self.ensure_status(&loan, LoanStatus::Pending, "rejected")?;
        self.loans.set_status(&loan, LoanStatus::Rejected).await
    }

    pub async fn cancel(&self, loan_id: Uuid) -> Result<Loan> {
        let loan = self.get_loan(loan_id).await?;
        match loan.status {
            LoanStatus::Pending | LoanStatus::Approved => {}
            status => {
                return Err(AppError::state_conflict(format!(
                    "loan {} cannot be cancelled in status {}",
                    loan.id, status
                ))
                .into());
            }
        }
        self.loans.set_status(&loan, LoanStatus::Cancelled).await
    }

    /// A repayment made outside payroll, e.g. a cash settlement. The
    /// amount is clamped to the remaining balance so the ledger never
    /// shows an overpayment.
    pub async fn record_manual_payment(
        &self,
        loan_id: Uuid,
        amount: Numeric,
    ) -> Result<(Loan, LoanPayment)> {
        let loan = self.get_loan(loan_id).await?;
        if loan.status != LoanStatus::Active {
            return Err(AppError::state_conflict(format!(
                "loan {} cannot take payments in status {}",
                loan.id, loan.status
            ))
            .into());
        }
        if !amount.is_positive() {
            return Err(AppError::validation("payment amount must be positive").into());
        }

        let amount = amount.min(loan.remaining_balance);
        let (loan, payment) = self.loans.record_payment(&loan, amount, None, Utc::now()).await?;
        if loan.status == LoanStatus::Completed {
            log::info!("Loan {} completed with a manual payment of {}", loan.id, amount);
        }
        Ok((loan, payment))
    }

    pub fn payments_remaining(&self, loan: &Loan) -> i64 {
        amortization::payments_remaining(loan.remaining_balance, loan.monthly_installment)
    }

    fn ensure_status(&self, loan: &Loan, expected: LoanStatus, verb: &str) -> Result<()> {
        if loan.status != expected {
            return Err(AppError::state_conflict(format!(
                "loan {} cannot be {} in status {}",
                loan.id, verb, loan.status
            ))
            .into());
        }
        Ok(())
    }
}
