#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use payrun::database::init_database;
use payrun::database::models::*;
use payrun::database::types::Numeric;
use payrun::services::{AttendanceSource, EmployeeDirectory, LeaveSource, LogNotifier};
use payrun::{AppState, Config, ExternalSources};

// Test database wrapper
pub struct TestDb {
    pub pool: SqlitePool,
    _temp_dir: TempDir,
}

impl TestDb {
    pub async fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let database_url = format!("sqlite:{}/test.db", temp_dir.path().display());
        let pool = init_database(&database_url).await?;

        Ok(TestDb {
            pool,
            _temp_dir: temp_dir,
        })
    }
}

/// Canned external systems, keyed by employee. Install fixtures before
/// building the app.
#[derive(Default)]
pub struct StubSources {
    pub employees: Vec<EmployeeProfile>,
    pub attendance: HashMap<Uuid, Vec<AttendanceRecord>>,
    pub leave: HashMap<Uuid, Vec<ApprovedLeave>>,
    pub failing: HashSet<Uuid>,
}

impl StubSources {
    pub fn with_employee(mut self, profile: EmployeeProfile) -> Self {
        self.employees.push(profile);
        self
    }

    pub fn with_attendance(mut self, employee_id: Uuid, records: Vec<AttendanceRecord>) -> Self {
        self.attendance.insert(employee_id, records);
        self
    }

    pub fn with_leave(mut self, employee_id: Uuid, leave: Vec<ApprovedLeave>) -> Self {
        self.leave.insert(employee_id, leave);
        self
    }

    /// Attendance fetches for this employee fail with a source error.
    pub fn with_failing(mut self, employee_id: Uuid) -> Self {
        self.failing.insert(employee_id);
        self
    }
}

struct StubDirectory(Vec<EmployeeProfile>);

#[async_trait]
impl EmployeeDirectory for StubDirectory {
    async fn active_employees(&self, _range: &DateRange) -> Result<Vec<EmployeeProfile>> {
        Ok(self.0.clone())
    }
}

struct StubAttendance {
    records: HashMap<Uuid, Vec<AttendanceRecord>>,
    failing: HashSet<Uuid>,
}

#[async_trait]
impl AttendanceSource for StubAttendance {
    async fn fetch_attendance(
        &self,
        employee_id: Uuid,
        _range: &DateRange,
    ) -> Result<Vec<AttendanceRecord>> {
        if self.failing.contains(&employee_id) {
            anyhow::bail!("attendance source unavailable for employee {}", employee_id);
        }
        Ok(self.records.get(&employee_id).cloned().unwrap_or_default())
    }
}

struct StubLeave(HashMap<Uuid, Vec<ApprovedLeave>>);

#[async_trait]
impl LeaveSource for StubLeave {
    async fn fetch_approved_leave(
        &self,
        employee_id: Uuid,
        _range: &DateRange,
    ) -> Result<Vec<ApprovedLeave>> {
        Ok(self.0.get(&employee_id).cloned().unwrap_or_default())
    }
}

// Test application wrapper
pub struct TestApp {
    pub db: TestDb,
    pub state: AppState,
}

impl TestApp {
    pub async fn new(sources: StubSources) -> Result<Self> {
        let db = TestDb::new().await?;

        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            environment: "test".to_string(),
            overtime_daily_cap_hours: 4,
            import_concurrency: 4,
        };

        let external = ExternalSources {
            attendance: Arc::new(StubAttendance {
                records: sources.attendance,
                failing: sources.failing,
            }),
            leave: Arc::new(StubLeave(sources.leave)),
            directory: Arc::new(StubDirectory(sources.employees)),
            notifier: Arc::new(LogNotifier),
        };

        let state = AppState::new(db.pool.clone(), config, external);
        Ok(TestApp { db, state })
    }
}

pub fn setup_test_env() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

pub fn payroll_input(start: NaiveDate, end: NaiveDate) -> CreatePayrollInput {
    CreatePayrollInput {
        period_start: start,
        period_end: end,
        overlap_override: false,
        overlap_reason: None,
    }
}

pub fn monthly_profile(name: &str, salary: Decimal) -> EmployeeProfile {
    EmployeeProfile {
        employee_id: Uuid::new_v4(),
        name: name.to_string(),
        position: Some("Accountant".to_string()),
        department: Some("Finance".to_string()),
        contract_type: ContractType::Monthly,
        payment_method: PaymentMethod::BankTransfer,
        base_rate: Numeric(salary),
        scheduled_start: time(9, 0),
        scheduled_daily_hours: Numeric(dec!(8)),
        overtime_multiplier: Numeric(dec!(1.5)),
        late_forgiveness_minutes: 15,
        late_forgiveness_per_quarter: 2,
        absence_charge: Numeric(dec!(500)),
        late_charge: Numeric(dec!(200)),
        excess_leave_charge: Numeric(dec!(300)),
        leave_allowance_days: Numeric(dec!(2)),
    }
}

pub fn profile_with_contract(
    name: &str,
    contract_type: ContractType,
    base_rate: Decimal,
) -> EmployeeProfile {
    EmployeeProfile {
        contract_type,
        base_rate: Numeric(base_rate),
        ..monthly_profile(name, base_rate)
    }
}

pub fn present(day: NaiveDate) -> AttendanceRecord {
    AttendanceRecord {
        day,
        status: RawAttendanceStatus::Present,
        check_in: Some(time(9, 0)),
        check_out: Some(time(17, 0)),
    }
}

pub fn absent(day: NaiveDate) -> AttendanceRecord {
    AttendanceRecord {
        day,
        status: RawAttendanceStatus::Absent,
        check_in: None,
        check_out: None,
    }
}

pub fn leave_request(leave_type: &str, start: NaiveDate, end: NaiveDate) -> ApprovedLeave {
    ApprovedLeave {
        leave_type: leave_type.to_string(),
        start_day: start,
        end_day: end,
    }
}

/// Every weekday in the period marked present with the standard 9 to 17
/// punches.
pub fn full_attendance(start: NaiveDate, end: NaiveDate) -> Vec<AttendanceRecord> {
    let mut records = Vec::new();
    let mut day = start;
    while day <= end {
        if !payrun::engine::attendance::is_weekend(day) {
            records.push(present(day));
        }
        day = day.succ_opt().unwrap();
    }
    records
}

/// Walk a fresh payroll through import, leave review and overtime
/// review, leaving it ready to confirm.
pub async fn advance_to_overtime_review(app: &TestApp, payroll_id: Uuid, actor: Uuid) -> Result<()> {
    app.state.import.import_attendance(payroll_id).await?;
    app.state
        .lifecycle
        .finalize_attendance(payroll_id, actor)
        .await?;
    app.state.leave_review.process_leave_review(payroll_id).await?;
    app.state.lifecycle.finalize_leave(payroll_id, actor).await?;
    app.state
        .leave_review
        .process_overtime_review(payroll_id)
        .await?;
    Ok(())
}

pub fn assert_state_conflict(err: &anyhow::Error) {
    match err.downcast_ref::<payrun::AppError>() {
        Some(payrun::AppError::StateConflict(_)) => {}
        other => panic!("expected a state conflict, got {:?}", other),
    }
}

pub fn assert_validation_failure(err: &anyhow::Error) {
    match err.downcast_ref::<payrun::AppError>() {
        Some(payrun::AppError::ValidationFailure(_)) => {}
        other => panic!("expected a validation failure, got {:?}", other),
    }
}
