use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::PaymentMethod;
use crate::database::types::Numeric;

/// Per-payment-method slice of a confirmed payroll, handed to finance as
/// one disbursement unit. At most one batch per method per payroll.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PayrollBatch {
    pub id: Uuid,
    pub payroll_id: Uuid,
    pub payment_method: PaymentMethod,
    pub total_net: Numeric,
    pub employee_count: i64,
    pub disbursement_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}
