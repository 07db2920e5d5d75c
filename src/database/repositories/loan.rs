use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::{
    models::{Loan, LoanInput, LoanPayment, LoanStatus},
    types::Numeric,
};
use crate::error::AppError;

const LOAN_COLUMNS: &str = r#"
    id,
    employee_id,
    principal,
    term_months,
    annual_interest_rate,
    monthly_installment,
    remaining_balance,
    status,
    requested_at,
    approved_by,
    approved_at,
    activated_at,
    completed_on,
    version,
    created_at,
    updated_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id,
    loan_id,
    employee_payroll_id,
    amount,
    balance_after,
    paid_at
"#;

#[derive(Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: &LoanInput, monthly_installment: Numeric) -> Result<Loan> {
        let now = Utc::now();

        let loan = sqlx::query_as::<_, Loan>(&format!(
            r#"
            INSERT INTO
                loans (
                    id,
                    employee_id,
                    principal,
                    term_months,
                    annual_interest_rate,
                    monthly_installment,
                    remaining_balance,
                    status,
                    requested_at,
                    version,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.employee_id)
        .bind(input.principal)
        .bind(input.term_months)
        .bind(input.annual_interest_rate)
        .bind(monthly_installment)
        .bind(input.principal)
        .bind(LoanStatus::Pending)
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(loan)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> Result<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE employee_id = ?
            ORDER BY created_at DESC
            "#
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Active loans oldest first, the order installments are taken in.
    pub async fn list_active_for_employee(&self, employee_id: Uuid) -> Result<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            r#"
            SELECT {LOAN_COLUMNS}
            FROM loans
            WHERE employee_id = ? AND status = ?
            ORDER BY created_at
            "#
        ))
        .bind(employee_id)
        .bind(LoanStatus::Active)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    pub async fn approve(&self, loan: &Loan, approver: Uuid, at: DateTime<Utc>) -> Result<Loan> {
        let updated = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET status = ?, approved_by = ?, approved_at = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(LoanStatus::Approved)
        .bind(approver)
        .bind(at)
        .bind(at)
        .bind(loan.id)
        .bind(loan.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(loan.id))
    }

    pub async fn activate(&self, loan: &Loan, at: DateTime<Utc>) -> Result<Loan> {
        let updated = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET status = ?, activated_at = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(LoanStatus::Active)
        .bind(at)
        .bind(at)
        .bind(loan.id)
        .bind(loan.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(loan.id))
    }

    pub async fn set_status(&self, loan: &Loan, status: LoanStatus) -> Result<Loan> {
        let updated = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET status = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(Utc::now())
        .bind(loan.id)
        .bind(loan.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(loan.id))
    }

    /// Apply one repayment and append the ledger entry in its own
    /// transaction.
    pub async fn record_payment(
        &self,
        loan: &Loan,
        amount: Numeric,
        employee_payroll_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<(Loan, LoanPayment)> {
        let mut tx = self.pool.begin().await?;
        let applied = Self::record_payment_with(&mut tx, loan, amount, employee_payroll_id, at).await?;
        tx.commit().await?;

        Ok(applied)
    }

    /// Balance can never go below zero; a payment that reaches zero
    /// completes the loan and stamps the completion date.
    pub async fn record_payment_with(
        conn: &mut sqlx::SqliteConnection,
        loan: &Loan,
        amount: Numeric,
        employee_payroll_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<(Loan, LoanPayment)> {
        let new_balance = (loan.remaining_balance - amount).max(Numeric::ZERO);
        let completed = new_balance.is_zero();
        let status = if completed {
            LoanStatus::Completed
        } else {
            loan.status
        };
        let completed_on = if completed {
            Some(at.date_naive())
        } else {
            loan.completed_on
        };

        let updated = sqlx::query_as::<_, Loan>(&format!(
            r#"
            UPDATE loans
            SET
                remaining_balance = ?,
                status = ?,
                completed_on = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {LOAN_COLUMNS}
            "#
        ))
        .bind(new_balance)
        .bind(status)
        .bind(completed_on)
        .bind(at)
        .bind(loan.id)
        .bind(loan.version)
        .fetch_optional(&mut *conn)
        .await?;

        let updated = updated.ok_or_else(|| concurrent_update(loan.id))?;

        let payment = sqlx::query_as::<_, LoanPayment>(&format!(
            r#"
            INSERT INTO
                loan_payments (id, loan_id, employee_payroll_id, amount, balance_after, paid_at)
            VALUES
                (?, ?, ?, ?, ?, ?)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(loan.id)
        .bind(employee_payroll_id)
        .bind(amount)
        .bind(new_balance)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok((updated, payment))
    }

    pub async fn list_payments(&self, loan_id: Uuid) -> Result<Vec<LoanPayment>> {
        let payments = sqlx::query_as::<_, LoanPayment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM loan_payments
            WHERE loan_id = ?
            ORDER BY paid_at, rowid
            "#
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

fn concurrent_update(id: Uuid) -> anyhow::Error {
    anyhow::Error::new(AppError::state_conflict(format!(
        "loan {} was updated concurrently",
        id
    )))
}
