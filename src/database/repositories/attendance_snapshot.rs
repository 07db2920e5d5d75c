use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::models::{AttendanceSnapshot, NewAttendanceSnapshot};

const SNAPSHOT_COLUMNS: &str = r#"
    id,
    employee_payroll_id,
    day,
    classification,
    worked_hours,
    expected_hours,
    late_minutes,
    late_outcome,
    leave_type,
    updated_at
"#;

#[derive(Clone)]
pub struct AttendanceSnapshotRepository {
    pool: SqlitePool,
}

impl AttendanceSnapshotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write one classified day, overwriting any earlier row for the
    /// same `(employee_payroll_id, day)`. Imports and leave review both
    /// go through here, which keeps re-runs idempotent.
    pub async fn upsert(
        &self,
        snapshot: &NewAttendanceSnapshot,
        at: DateTime<Utc>,
    ) -> Result<AttendanceSnapshot> {
        let row = sqlx::query_as::<_, AttendanceSnapshot>(&format!(
            r#"
            INSERT INTO
                payroll_attendance_snapshots (
                    id,
                    employee_payroll_id,
                    day,
                    classification,
                    worked_hours,
                    expected_hours,
                    late_minutes,
                    late_outcome,
                    leave_type,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (employee_payroll_id, day) DO UPDATE
            SET
                classification = excluded.classification,
                worked_hours = excluded.worked_hours,
                expected_hours = excluded.expected_hours,
                late_minutes = excluded.late_minutes,
                late_outcome = excluded.late_outcome,
                leave_type = excluded.leave_type,
                updated_at = excluded.updated_at
            RETURNING {SNAPSHOT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(snapshot.employee_payroll_id)
        .bind(snapshot.day)
        .bind(snapshot.classification)
        .bind(snapshot.worked_hours)
        .bind(snapshot.expected_hours)
        .bind(snapshot.late_minutes)
        .bind(snapshot.late_outcome)
        .bind(snapshot.leave_type.clone())
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list_for_employee_payroll(
        &self,
        employee_payroll_id: Uuid,
    ) -> Result<Vec<AttendanceSnapshot>> {
        let rows = sqlx::query_as::<_, AttendanceSnapshot>(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS}
            FROM payroll_attendance_snapshots
            WHERE employee_payroll_id = ?
            ORDER BY day
            "#
        ))
        .bind(employee_payroll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn find_day(
        &self,
        employee_payroll_id: Uuid,
        day: NaiveDate,
    ) -> Result<Option<AttendanceSnapshot>> {
        let row = sqlx::query_as::<_, AttendanceSnapshot>(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS}
            FROM payroll_attendance_snapshots
            WHERE employee_payroll_id = ? AND day = ?
            "#
        ))
        .bind(employee_payroll_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Forgiven late days already on record for an employee in
    /// `[from, until)`, across all payrolls. Seeds the quarterly
    /// forgiveness budget before an import classifies new days.
    pub async fn count_forgiven_lates(
        &self,
        employee_id: Uuid,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT
                COUNT(*)
            FROM
                payroll_attendance_snapshots s
                JOIN employee_payrolls ep ON ep.id = s.employee_payroll_id
            WHERE
                ep.employee_id = ?
                AND s.day >= ?
                AND s.day < ?
                AND s.late_outcome = 'forgiven'
            "#,
        )
        .bind(employee_id)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
