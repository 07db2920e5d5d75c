use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::models::{EmployeePayroll, PaymentMethod, PayrollBatch};
use crate::database::repositories::PayrollBatchRepository;
use crate::database::types::Numeric;
use crate::error::AppError;

/// Splits a locked payroll into per-payment-method batches, the unit
/// finance actually disburses.
#[derive(Clone)]
pub struct PaymentBatchService {
    batches: PayrollBatchRepository,
}

impl PaymentBatchService {
    pub fn new(batches: PayrollBatchRepository) -> Self {
        Self { batches }
    }

    /// Group lines by payment method and persist one batch per group,
    /// inside the caller's transaction. Group order is stable across
    /// runs.
    pub async fn split_with(
        conn: &mut sqlx::SqliteConnection,
        payroll_id: Uuid,
        lines: &[EmployeePayroll],
        at: DateTime<Utc>,
    ) -> Result<Vec<PayrollBatch>> {
        let mut groups: BTreeMap<PaymentMethod, (Numeric, i64)> = BTreeMap::new();
        for line in lines {
            let entry = groups
                .entry(line.payment_method)
                .or_insert((Numeric::ZERO, 0));
            entry.0 += line.net_pay;
            entry.1 += 1;
        }

        let mut batches = Vec::with_capacity(groups.len());
        for (method, (total_net, employee_count)) in groups {
            let batch = PayrollBatchRepository::insert_with(
                conn,
                payroll_id,
                method,
                total_net,
                employee_count,
                at,
            )
            .await?;
            batches.push(batch);
        }

        Ok(batches)
    }

    pub async fn ensure_not_split(&self, payroll_id: Uuid) -> Result<()> {
        if !self.batches.list_for_payroll(payroll_id).await?.is_empty() {
            return Err(AppError::state_conflict(format!(
                "payroll {} already has payment batches",
                payroll_id
            ))
            .into());
        }
        Ok(())
    }

    pub async fn list_for_payroll(&self, payroll_id: Uuid) -> Result<Vec<PayrollBatch>> {
        self.batches.list_for_payroll(payroll_id).await
    }

    /// Attach the downstream disbursement reference. Write-once; a
    /// second write is a conflict.
    pub async fn set_disbursement_reference(
        &self,
        batch_id: Uuid,
        reference: &str,
    ) -> Result<PayrollBatch> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::validation("disbursement reference cannot be empty").into());
        }

        let batch = self
            .batches
            .find_by_id(batch_id)
            .await?
            .ok_or_else(|| AppError::not_found("payment batch", batch_id))?;

        self.batches.set_disbursement_reference(&batch, reference).await
    }
}
