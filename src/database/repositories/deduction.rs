use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::database::{
    models::{
        DeductionType, DeductionTypeInput, EmployeeDeduction, EmployeeDeductionInput,
    },
    types::Numeric,
};
use crate::error::AppError;

const TYPE_COLUMNS: &str = r#"
    id,
    site_id,
    name,
    category,
    is_mandatory,
    is_percentage,
    is_taxable,
    created_at,
    updated_at
"#;

const ASSIGNMENT_COLUMNS: &str = r#"
    id,
    employee_id,
    deduction_type_id,
    method,
    percentage,
    amount,
    max_amount,
    frequency,
    priority,
    effective_from,
    effective_to,
    is_active,
    total_deducted,
    deduction_count,
    last_deduction_date,
    version,
    created_at,
    updated_at
"#;

/// Catalog of deduction types plus the per-employee assignments that
/// reference them.
#[derive(Clone)]
pub struct DeductionRepository {
    pool: SqlitePool,
}

impl DeductionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_type(&self, input: &DeductionTypeInput) -> Result<DeductionType> {
        let now = Utc::now();

        let deduction_type = sqlx::query_as::<_, DeductionType>(&format!(
            r#"
            INSERT INTO
                deduction_types (
                    id,
                    site_id,
                    name,
                    category,
                    is_mandatory,
                    is_percentage,
                    is_taxable,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {TYPE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.site_id)
        .bind(input.name.clone())
        .bind(input.category)
        .bind(input.is_mandatory)
        .bind(input.is_percentage)
        .bind(input.is_taxable)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(deduction_type)
    }

    pub async fn find_type(&self, id: Uuid) -> Result<Option<DeductionType>> {
        let deduction_type = sqlx::query_as::<_, DeductionType>(&format!(
            "SELECT {TYPE_COLUMNS} FROM deduction_types WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deduction_type)
    }

    /// Site-scoped types plus the global ones when a site is given,
    /// everything otherwise.
    pub async fn list_types(&self, site_id: Option<Uuid>) -> Result<Vec<DeductionType>> {
        let types = match site_id {
            Some(site) => {
                sqlx::query_as::<_, DeductionType>(&format!(
                    r#"
                    SELECT {TYPE_COLUMNS}
                    FROM deduction_types
                    WHERE site_id = ? OR site_id IS NULL
                    ORDER BY name
                    "#
                ))
                .bind(site)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, DeductionType>(&format!(
                    "SELECT {TYPE_COLUMNS} FROM deduction_types ORDER BY name"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(types)
    }

    pub async fn assign(&self, input: &EmployeeDeductionInput) -> Result<EmployeeDeduction> {
        let now = Utc::now();

        let assignment = sqlx::query_as::<_, EmployeeDeduction>(&format!(
            r#"
            INSERT INTO
                employee_deductions (
                    id,
                    employee_id,
                    deduction_type_id,
                    method,
                    percentage,
                    amount,
                    max_amount,
                    frequency,
                    priority,
                    effective_from,
                    effective_to,
                    is_active,
                    total_deducted,
                    deduction_count,
                    version,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, 0, 0, ?, ?)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(input.employee_id)
        .bind(input.deduction_type_id)
        .bind(input.method)
        .bind(input.percentage)
        .bind(input.amount)
        .bind(input.max_amount)
        .bind(input.frequency)
        .bind(input.priority)
        .bind(input.effective_from)
        .bind(input.effective_to)
        .bind(Numeric::ZERO)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(assignment)
    }

    pub async fn find_assignment(&self, id: Uuid) -> Result<Option<EmployeeDeduction>> {
        let assignment = sqlx::query_as::<_, EmployeeDeduction>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM employee_deductions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    pub async fn list_for_employee(&self, employee_id: Uuid) -> Result<Vec<EmployeeDeduction>> {
        let assignments = sqlx::query_as::<_, EmployeeDeduction>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM employee_deductions
            WHERE employee_id = ?
            ORDER BY priority, created_at
            "#
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    /// Active assignments in evaluation order: ascending priority, then
    /// assignment age as the tie-breaker.
    pub async fn list_active_for_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<EmployeeDeduction>> {
        let assignments = sqlx::query_as::<_, EmployeeDeduction>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM employee_deductions
            WHERE employee_id = ? AND is_active = 1
            ORDER BY priority, created_at
            "#
        ))
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    pub async fn set_active(
        &self,
        assignment: &EmployeeDeduction,
        active: bool,
    ) -> Result<EmployeeDeduction> {
        let updated = sqlx::query_as::<_, EmployeeDeduction>(&format!(
            r#"
            UPDATE employee_deductions
            SET is_active = ?, version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(active)
        .bind(Utc::now())
        .bind(assignment.id)
        .bind(assignment.version)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| concurrent_update(assignment.id))
    }

    /// Record one application against an assignment inside the
    /// confirmation transaction. One-time deductions deactivate and
    /// close their effective range in the same write.
    pub async fn record_application_with(
        conn: &mut sqlx::SqliteConnection,
        assignment: &EmployeeDeduction,
        amount: Numeric,
        applied_on: NaiveDate,
        deactivate: bool,
    ) -> Result<EmployeeDeduction> {
        let effective_to = if deactivate {
            Some(assignment.effective_to.unwrap_or(applied_on))
        } else {
            assignment.effective_to
        };

        let updated = sqlx::query_as::<_, EmployeeDeduction>(&format!(
            r#"
            UPDATE employee_deductions
            SET
                total_deducted = ?,
                deduction_count = deduction_count + 1,
                last_deduction_date = ?,
                is_active = ?,
                effective_to = ?,
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(assignment.total_deducted + amount)
        .bind(applied_on)
        .bind(!deactivate)
        .bind(effective_to)
        .bind(Utc::now())
        .bind(assignment.id)
        .bind(assignment.version)
        .fetch_optional(&mut *conn)
        .await?;

        updated.ok_or_else(|| concurrent_update(assignment.id))
    }
}

fn concurrent_update(id: Uuid) -> anyhow::Error {
    anyhow::Error::new(AppError::state_conflict(format!(
        "employee deduction {} was updated concurrently",
        id
    )))
}
