use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::{
    models::{AttendanceTally, EmployeePayroll, NewEmployeePayroll},
    types::Numeric,
};
use crate::error::AppError;

const EMPLOYEE_PAYROLL_COLUMNS: &str = r#"
    id,
    payroll_id,
    employee_id,
    employee_name,
    contract_type,
    position,
    department,
    payment_method,
    base_rate,
    scheduled_daily_hours,
    overtime_multiplier,
    absence_charge,
    late_charge,
    excess_leave_charge,
    leave_allowance_days,
    worked_days,
    absent_days,
    late_days,
    leave_days,
    excess_leave_days,
    holiday_days,
    worked_hours,
    overtime_hours,
    overtime_pay,
    gross_pay,
    total_deductions,
    net_pay,
    version,
    imported_at,
    updated_at
"#;

#[derive(Clone)]
pub struct EmployeePayrollRepository {
    pool: SqlitePool,
}

impl EmployeePayrollRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite one employee's line, keyed by
    /// `(payroll_id, employee_id)`. A re-import refreshes the frozen
    /// terms and tallies and resets everything derived later in the
    /// lifecycle (excess leave, overtime, totals).
    pub async fn upsert(
        &self,
        row: &NewEmployeePayroll,
        at: DateTime<Utc>,
    ) -> Result<EmployeePayroll> {
        let employee_payroll = sqlx::query_as::<_, EmployeePayroll>(&format!(
            r#"
            INSERT INTO
                employee_payrolls (
                    id,
                    payroll_id,
                    employee_id,
                    employee_name,
                    contract_type,
                    position,
                    department,
                    payment_method,
                    base_rate,
                    scheduled_daily_hours,
                    overtime_multiplier,
                    absence_charge,
                    late_charge,
                    excess_leave_charge,
                    leave_allowance_days,
                    worked_days,
                    absent_days,
                    late_days,
                    leave_days,
                    excess_leave_days,
                    holiday_days,
                    worked_hours,
                    overtime_hours,
                    overtime_pay,
                    gross_pay,
                    total_deductions,
                    net_pay,
                    version,
                    imported_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            ON CONFLICT (payroll_id, employee_id) DO UPDATE
            SET
                employee_name = excluded.employee_name,
                contract_type = excluded.contract_type,
                position = excluded.position,
                department = excluded.department,
                payment_method = excluded.payment_method,
                base_rate = excluded.base_rate,
                scheduled_daily_hours = excluded.scheduled_daily_hours,
                overtime_multiplier = excluded.overtime_multiplier,
                absence_charge = excluded.absence_charge,
                late_charge = excluded.late_charge,
                excess_leave_charge = excluded.excess_leave_charge,
                leave_allowance_days = excluded.leave_allowance_days,
                worked_days = excluded.worked_days,
                absent_days = excluded.absent_days,
                late_days = excluded.late_days,
                leave_days = excluded.leave_days,
                excess_leave_days = excluded.excess_leave_days,
                holiday_days = excluded.holiday_days,
                worked_hours = excluded.worked_hours,
                overtime_hours = excluded.overtime_hours,
                overtime_pay = excluded.overtime_pay,
                gross_pay = excluded.gross_pay,
                total_deductions = excluded.total_deductions,
                net_pay = excluded.net_pay,
                version = employee_payrolls.version + 1,
                imported_at = excluded.imported_at,
                updated_at = excluded.updated_at
            RETURNING {EMPLOYEE_PAYROLL_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(row.payroll_id)
        .bind(row.profile.employee_id)
        .bind(row.profile.name.clone())
        .bind(row.profile.contract_type)
        .bind(row.profile.position.clone())
        .bind(row.profile.department.clone())
        .bind(row.profile.payment_method)
        .bind(row.profile.base_rate)
        .bind(row.profile.scheduled_daily_hours)
        .bind(row.profile.overtime_multiplier)
        .bind(row.profile.absence_charge)
        .bind(row.profile.late_charge)
        .bind(row.profile.excess_leave_charge)
        .bind(row.profile.leave_allowance_days)
        .bind(row.tally.worked_days)
        .bind(row.tally.absent_days)
        .bind(row.tally.late_days)
        .bind(row.tally.leave_days)
        .bind(Numeric::ZERO)
        .bind(row.tally.holiday_days)
        .bind(row.tally.worked_hours)
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(Numeric::ZERO)
        .bind(at)
        .bind(at)
        .fetch_one(&self.pool)
        .await?;

        Ok(employee_payroll)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EmployeePayroll>> {
        let employee_payroll = sqlx::query_as::<_, EmployeePayroll>(&format!(
            "SELECT {EMPLOYEE_PAYROLL_COLUMNS} FROM employee_payrolls WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee_payroll)
    }

    pub async fn list_for_payroll(&self, payroll_id: Uuid) -> Result<Vec<EmployeePayroll>> {
        let rows = sqlx::query_as::<_, EmployeePayroll>(&format!(
            r#"
            SELECT {EMPLOYEE_PAYROLL_COLUMNS}
            FROM employee_payrolls
            WHERE payroll_id = ?
            ORDER BY employee_name, employee_id
            "#
        ))
        .bind(payroll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Replace the attendance tallies after leave review reclassifies
    /// days.
    pub async fn update_tally(
        &self,
        employee_payroll: &EmployeePayroll,
        tally: &AttendanceTally,
        excess_leave_days: Numeric,
    ) -> Result<EmployeePayroll> {
        let updated = sqlx::query_as::<_, EmployeePayroll>(&format!(
            r#"
            UPDATE employee_payrolls
            SET
                worked_days = ?,
                absent_days = ?,
                late_days = ?,
                leave_days = ?,
                excess_leave_days = ?,
                holiday_days = ?,
                worked_hours = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {EMPLOYEE_PAYROLL_COLUMNS}
            "#
        ))
        .bind(tally.worked_days)
        .bind(tally.absent_days)
        .bind(tally.late_days)
        .bind(tally.leave_days)
        .bind(excess_leave_days)
        .bind(tally.holiday_days)
        .bind(tally.worked_hours)
        .bind(Utc::now())
        .bind(employee_payroll.id)
        .bind(employee_payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(employee_payroll.id))
    }

    pub async fn update_overtime(
        &self,
        employee_payroll: &EmployeePayroll,
        overtime_hours: Numeric,
        overtime_pay: Numeric,
    ) -> Result<EmployeePayroll> {
        let updated = sqlx::query_as::<_, EmployeePayroll>(&format!(
            r#"
            UPDATE employee_payrolls
            SET overtime_hours = ?, overtime_pay = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {EMPLOYEE_PAYROLL_COLUMNS}
            "#
        ))
        .bind(overtime_hours)
        .bind(overtime_pay)
        .bind(Utc::now())
        .bind(employee_payroll.id)
        .bind(employee_payroll.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(employee_payroll.id))
    }

    pub async fn update_totals(
        &self,
        employee_payroll: &EmployeePayroll,
        gross_pay: Numeric,
        total_deductions: Numeric,
        net_pay: Numeric,
    ) -> Result<EmployeePayroll> {
        let mut conn = self.pool.acquire().await?;
        let updated = Self::update_totals_with(
            &mut conn,
            employee_payroll,
            gross_pay,
            total_deductions,
            net_pay,
        )
        .await?;

        Ok(updated)
    }

    /// Totals write usable inside the confirmation transaction.
    pub async fn update_totals_with(
        conn: &mut sqlx::SqliteConnection,
        employee_payroll: &EmployeePayroll,
        gross_pay: Numeric,
        total_deductions: Numeric,
        net_pay: Numeric,
    ) -> Result<EmployeePayroll> {
        let updated = sqlx::query_as::<_, EmployeePayroll>(&format!(
            r#"
            UPDATE employee_payrolls
            SET gross_pay = ?, total_deductions = ?, net_pay = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {EMPLOYEE_PAYROLL_COLUMNS}
            "#
        ))
        .bind(gross_pay)
        .bind(total_deductions)
        .bind(net_pay)
        .bind(Utc::now())
        .bind(employee_payroll.id)
        .bind(employee_payroll.version)
        .fetch_optional(&mut *conn)
        .await?;

        updated.ok_or_else(|| concurrent_update(employee_payroll.id))
    }
}

fn concurrent_update(id: Uuid) -> anyhow::Error {
    anyhow::Error::new(AppError::state_conflict(format!(
        "employee payroll {} was updated concurrently",
        id
    )))
}
