use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::models::{NewPayrollDeduction, PayrollDeduction};

const DEDUCTION_COLUMNS: &str = r#"
    id,
    employee_payroll_id,
    category,
    label,
    amount,
    deduction_type_id,
    loan_id,
    created_at
"#;

/// Append-only rows; every persisted total is a recomputation over
/// these.
#[derive(Clone)]
pub struct PayrollDeductionRepository {
    pool: SqlitePool,
}

impl PayrollDeductionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        row: &NewPayrollDeduction,
        at: DateTime<Utc>,
    ) -> Result<PayrollDeduction> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, row, at).await
    }

    pub async fn insert_with(
        conn: &mut sqlx::SqliteConnection,
        row: &NewPayrollDeduction,
        at: DateTime<Utc>,
    ) -> Result<PayrollDeduction> {
        let inserted = sqlx::query_as::<_, PayrollDeduction>(&format!(
            r#"
            INSERT INTO
                payroll_deductions (
                    id,
                    employee_payroll_id,
                    category,
                    label,
                    amount,
                    deduction_type_id,
                    loan_id,
                    created_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {DEDUCTION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(row.employee_payroll_id)
        .bind(row.category)
        .bind(row.label.clone())
        .bind(row.amount)
        .bind(row.deduction_type_id)
        .bind(row.loan_id)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(inserted)
    }

    /// Rows in insertion order.
    pub async fn list_for_employee_payroll(
        &self,
        employee_payroll_id: Uuid,
    ) -> Result<Vec<PayrollDeduction>> {
        let rows = sqlx::query_as::<_, PayrollDeduction>(&format!(
            r#"
            SELECT {DEDUCTION_COLUMNS}
            FROM payroll_deductions
            WHERE employee_payroll_id = ?
            ORDER BY rowid
            "#
        ))
        .bind(employee_payroll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_for_payroll(&self, payroll_id: Uuid) -> Result<Vec<PayrollDeduction>> {
        let rows = sqlx::query_as::<_, PayrollDeduction>(&format!(
            r#"
            SELECT
                {DEDUCTION_COLUMNS}
            FROM
                payroll_deductions
            WHERE
                employee_payroll_id IN (
                    SELECT id FROM employee_payrolls WHERE payroll_id = ?
                )
            ORDER BY rowid
            "#
        ))
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
