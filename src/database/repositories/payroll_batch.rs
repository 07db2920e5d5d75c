use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::{models::{PayrollBatch, PaymentMethod}, types::Numeric};
use crate::error::AppError;

const BATCH_COLUMNS: &str = r#"
    id,
    payroll_id,
    payment_method,
    total_net,
    employee_count,
    disbursement_reference,
    created_at
"#;

#[derive(Clone)]
pub struct PayrollBatchRepository {
    pool: SqlitePool,
}

impl PayrollBatchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        payroll_id: Uuid,
        payment_method: PaymentMethod,
        total_net: Numeric,
        employee_count: i64,
        at: DateTime<Utc>,
    ) -> Result<PayrollBatch> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_with(&mut conn, payroll_id, payment_method, total_net, employee_count, at).await
    }

    pub async fn insert_with(
        conn: &mut sqlx::SqliteConnection,
        payroll_id: Uuid,
        payment_method: PaymentMethod,
        total_net: Numeric,
        employee_count: i64,
        at: DateTime<Utc>,
    ) -> Result<PayrollBatch> {
        let batch = sqlx::query_as::<_, PayrollBatch>(&format!(
            r#"
            INSERT INTO
                payroll_batches (id, payroll_id, payment_method, total_net, employee_count, created_at)
            VALUES
                (?, ?, ?, ?, ?, ?)
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(payroll_id)
        .bind(payment_method)
        .bind(total_net)
        .bind(employee_count)
        .bind(at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(batch)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<PayrollBatch>> {
        let batch = sqlx::query_as::<_, PayrollBatch>(&format!(
            "SELECT {BATCH_COLUMNS} FROM payroll_batches WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    pub async fn list_for_payroll(&self, payroll_id: Uuid) -> Result<Vec<PayrollBatch>> {
        let batches = sqlx::query_as::<_, PayrollBatch>(&format!(
            r#"
            SELECT {BATCH_COLUMNS}
            FROM payroll_batches
            WHERE payroll_id = ?
            ORDER BY payment_method
            "#
        ))
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Each batch maps to at most one downstream disbursement, so the
    /// reference can only be written while it is still empty.
    pub async fn set_disbursement_reference(
        &self,
        batch: &PayrollBatch,
        reference: &str,
    ) -> Result<PayrollBatch> {
        let updated = sqlx::query_as::<_, PayrollBatch>(&format!(
            r#"
            UPDATE payroll_batches
            SET disbursement_reference = ?
            WHERE id = ? AND disbursement_reference IS NULL
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(reference)
        .bind(batch.id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| {
            anyhow::Error::new(AppError::state_conflict(format!(
                "batch {} already has a disbursement reference",
                batch.id
            )))
        })
    }
}
