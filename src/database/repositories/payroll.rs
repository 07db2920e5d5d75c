use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::{
    models::{
        CreatePayrollInput, DateRange, Payroll, PayrollPublicHoliday, PayrollStatus,
        PublicHolidayInput,
    },
    types::Numeric,
};
use crate::error::AppError;

const PAYROLL_COLUMNS: &str = r#"
    id,
    period_start,
    period_end,
    status,
    overlap_override,
    overlap_reason,
    total_gross,
    total_deductions,
    total_net,
    employee_count,
    import_count,
    last_imported_at,
    attendance_finalized,
    attendance_finalized_by,
    attendance_finalized_at,
    attendance_notified,
    leave_finalized,
    leave_finalized_by,
    leave_finalized_at,
    leave_notified,
    overtime_finalized,
    overtime_finalized_by,
    overtime_finalized_at,
    payment_source,
    sent_to_finance_at,
    paid_at,
    version,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PayrollRepository {
    pool: SqlitePool,
}

impl PayrollRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new payroll period in its initial review stage.
    pub async fn create(&self, input: &CreatePayrollInput) -> Result<Payroll> {
        let now = Utc::now();

        let payroll = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            INSERT INTO
                payrolls (
                    id,
                    period_start,
                    period_end,
                    status,
                    overlap_override,
                    overlap_reason,
                    total_gross,
                    total_deductions,
                    total_net,
                    employee_count,
                    import_count,
                    attendance_finalized,
                    attendance_notified,
                    leave_finalized,
                    leave_notified,
                    overtime_finalized,
                    version,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 0, 0, 0, 0, 0, 0, ?, ?)
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(PayrollStatus::PublicHolidaysReview)
        .bind(input.overlap_override)
        .bind(input.overlap_reason.clone())
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(payroll)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payroll>> {
        let payroll = sqlx::query_as::<_, Payroll>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payrolls WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payroll)
    }

    pub async fn list(&self) -> Result<Vec<Payroll>> {
        let payrolls = sqlx::query_as::<_, Payroll>(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payrolls ORDER BY period_start DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(payrolls)
    }

    /// Payrolls whose period intersects the given range.
    pub async fn find_overlapping(&self, range: &DateRange) -> Result<Vec<Payroll>> {
        let payrolls = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            SELECT {PAYROLL_COLUMNS}
            FROM payrolls
            WHERE period_start <= ? AND period_end >= ?
            ORDER BY period_start
            "#
        ))
        .bind(range.end)
        .bind(range.start)
        .fetch_all(&self.pool)
        .await?;

        Ok(payrolls)
    }

    /// Record one completed import run: bump the counter, stamp the time
    /// and move the payroll to the given stage. The version guard makes
    /// this the single critical section of an import.
    pub async fn record_import(
        &self,
        payroll: &Payroll,
        status: PayrollStatus,
        employee_count: i64,
        at: DateTime<Utc>,
    ) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                status = ?,
                employee_count = ?,
                import_count = import_count + 1,
                last_imported_at = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(status)
        .bind(employee_count)
        .bind(at)
        .bind(at)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    /// Drop all imported data for the payroll: counters, totals and the
    /// employee rows (snapshots cascade). Runs in one transaction so a
    /// stale version guard never leaves rows half-deleted.
    pub async fn reset_import(&self, payroll: &Payroll) -> Result<Payroll> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                employee_count = 0,
                import_count = 0,
                last_imported_at = NULL,
                total_gross = ?,
                total_deductions = ?,
                total_net = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(now)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&mut *tx)
        .await?;

        let updated = updated.ok_or_else(|| concurrent_update(payroll.id))?;

        sqlx::query("DELETE FROM employee_payrolls WHERE payroll_id = ?")
            .bind(payroll.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn finalize_attendance(
        &self,
        payroll: &Payroll,
        actor: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                status = ?,
                attendance_finalized = 1,
                attendance_finalized_by = ?,
                attendance_finalized_at = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ? AND attendance_finalized = 0
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(PayrollStatus::LeaveReview)
        .bind(actor)
        .bind(at)
        .bind(at)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    pub async fn mark_attendance_notified(&self, payroll: &Payroll) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET attendance_notified = 1, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(Utc::now())
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    pub async fn finalize_leave(
        &self,
        payroll: &Payroll,
        actor: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                status = ?,
                leave_finalized = 1,
                leave_finalized_by = ?,
                leave_finalized_at = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ? AND leave_finalized = 0
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(PayrollStatus::OvertimeReview)
        .bind(actor)
        .bind(at)
        .bind(at)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    pub async fn mark_leave_notified(&self, payroll: &Payroll) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET leave_notified = 1, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(Utc::now())
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    /// Final step of confirmation; runs inside the confirmation
    /// transaction so deduction rows and the lock land together.
    pub async fn confirm_with(
        conn: &mut sqlx::SqliteConnection,
        payroll: &Payroll,
        actor: Uuid,
        at: DateTime<Utc>,
        total_gross: Numeric,
        total_deductions: Numeric,
        total_net: Numeric,
    ) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                status = ?,
                overtime_finalized = 1,
                overtime_finalized_by = ?,
                overtime_finalized_at = ?,
                total_gross = ?,
                total_deductions = ?,
                total_net = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ? AND overtime_finalized = 0
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(PayrollStatus::ConfirmedAndLocked)
        .bind(actor)
        .bind(at)
        .bind(total_gross)
        .bind(total_deductions)
        .bind(total_net)
        .bind(at)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&mut *conn)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    pub async fn update_totals(
        &self,
        payroll: &Payroll,
        total_gross: Numeric,
        total_deductions: Numeric,
        total_net: Numeric,
    ) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                total_gross = ?,
                total_deductions = ?,
                total_net = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(total_gross)
        .bind(total_deductions)
        .bind(total_net)
        .bind(Utc::now())
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    /// Finance handoff, written in the same transaction as the payment
    /// batches.
    pub async fn send_to_finance_with(
        conn: &mut sqlx::SqliteConnection,
        payroll: &Payroll,
        payment_source: &str,
        at: DateTime<Utc>,
    ) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET
                status = ?,
                payment_source = ?,
                sent_to_finance_at = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(PayrollStatus::PendingFinanceReview)
        .bind(payment_source)
        .bind(at)
        .bind(at)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&mut *conn)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    pub async fn mark_paid(&self, payroll: &Payroll, at: DateTime<Utc>) -> Result<Payroll> {
        let updated = sqlx::query_as::<_, Payroll>(&format!(
            r#"
            UPDATE payrolls
            SET status = ?, paid_at = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(PayrollStatus::Paid)
        .bind(at)
        .bind(at)
        .bind(payroll.id)
        .bind(payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(payroll.id))
    }

    pub async fn add_holiday(
        &self,
        payroll_id: Uuid,
        input: &PublicHolidayInput,
    ) -> Result<PayrollPublicHoliday> {
        let holiday = sqlx::query_as::<_, PayrollPublicHoliday>(
            r#"
            INSERT INTO
                payroll_public_holidays (id, payroll_id, name, start_day, end_day, paid, created_at)
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id,
                payroll_id,
                name,
                start_day,
                end_day,
                paid,
                created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payroll_id)
        .bind(input.name.clone())
        .bind(input.start_day)
        .bind(input.end_day)
        .bind(input.paid)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(holiday)
    }

    pub async fn list_holidays(&self, payroll_id: Uuid) -> Result<Vec<PayrollPublicHoliday>> {
        let holidays = sqlx::query_as::<_, PayrollPublicHoliday>(
            r#"
            SELECT
                id,
                payroll_id,
                name,
                start_day,
                end_day,
                paid,
                created_at
            FROM
                payroll_public_holidays
            WHERE
                payroll_id = ?
            ORDER BY
                start_day
            "#,
        )
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(holidays)
    }

    pub async fn remove_holiday(&self, payroll_id: Uuid, holiday_id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM payroll_public_holidays WHERE id = ? AND payroll_id = ?")
                .bind(holiday_id)
                .bind(payroll_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn concurrent_update(id: Uuid) -> anyhow::Error {
    anyhow::Error::new(AppError::state_conflict(format!(
        "payroll {} was updated concurrently",
        id
    )))
}
