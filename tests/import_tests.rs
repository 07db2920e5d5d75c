use payrun::database::models::{DayClassification, PayrollStatus, PublicHolidayInput};
use payrun::database::repositories::AttendanceSnapshotRepository;
use payrun::database::types::Numeric;
use rust_decimal_macros::dec;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_reimport_replaces_lines_instead_of_duplicating() {
    common::setup_test_env();
    let profile = common::monthly_profile("Hala Noor", dec!(24000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(
            employee_id,
            common::full_attendance(common::date(2025, 1, 1), common::date(2025, 1, 31)),
        );
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 1, 1), common::date(2025, 1, 31));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    let first = app.state.import.import_attendance(payroll.id).await.unwrap();
    let lines_after_first = app
        .state
        .lifecycle
        .list_employee_payrolls(payroll.id)
        .await
        .unwrap();

    let second = app.state.import.import_attendance(payroll.id).await.unwrap();
    let lines_after_second = app
        .state
        .lifecycle
        .list_employee_payrolls(payroll.id)
        .await
        .unwrap();

    assert_eq!(first.imported, 1);
    assert_eq!(second.imported, 1);
    assert_eq!(first.import_count, 1);
    assert_eq!(second.import_count, 2);

    assert_eq!(lines_after_first.len(), 1);
    assert_eq!(lines_after_second.len(), 1);
    assert_eq!(lines_after_first[0].id, lines_after_second[0].id);
    assert_eq!(
        lines_after_first[0].worked_days,
        lines_after_second[0].worked_days
    );
    assert_eq!(
        lines_after_first[0].worked_hours,
        lines_after_second[0].worked_hours
    );

    let snapshots = AttendanceSnapshotRepository::new(app.db.pool.clone());
    let days = snapshots
        .list_for_employee_payroll(lines_after_second[0].id)
        .await
        .unwrap();
    // One snapshot per calendar day, re-written in place.
    assert_eq!(days.len(), 31);
}

#[tokio::test]
async fn test_failing_employee_is_reported_but_not_fatal() {
    common::setup_test_env();
    let good = common::monthly_profile("Yusuf Karim", dec!(20000));
    let bad = common::monthly_profile("Dina Aziz", dec!(22000));
    let good_id = good.employee_id;
    let bad_id = bad.employee_id;

    let sources = common::StubSources::default()
        .with_employee(good)
        .with_employee(bad)
        .with_attendance(
            good_id,
            common::full_attendance(common::date(2025, 2, 1), common::date(2025, 2, 28)),
        )
        .with_failing(bad_id);
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 2, 1), common::date(2025, 2, 28));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    let report = app.state.import.import_attendance(payroll.id).await.unwrap();
    assert_eq!(report.imported, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].employee_id, bad_id);

    let lines = app
        .state
        .lifecycle
        .list_employee_payrolls(payroll.id)
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].employee_id, good_id);

    // The issue notice went out, so the notified flag is set.
    let payroll = app.state.lifecycle.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.import_count, 1);
    assert!(payroll.attendance_notified);
}

#[tokio::test]
async fn test_import_fails_outright_when_every_employee_fails() {
    common::setup_test_env();
    let profile = common::monthly_profile("Tarek Fares", dec!(19000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_failing(employee_id);
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 3, 1), common::date(2025, 3, 31));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    let err = app.state.import.import_attendance(payroll.id).await.unwrap_err();
    match err.downcast_ref::<payrun::AppError>() {
        Some(payrun::AppError::PartialImportFailure { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].employee_id, employee_id);
        }
        other => panic!("expected a partial import failure, got {:?}", other),
    }

    // A failed run leaves no trace on the payroll.
    let payroll = app.state.lifecycle.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::PublicHolidaysReview);
    assert_eq!(payroll.import_count, 0);
    assert!(payroll.last_imported_at.is_none());
}

#[tokio::test]
async fn test_import_with_no_active_employees_is_a_noop() {
    common::setup_test_env();
    let app = common::TestApp::new(common::StubSources::default())
        .await
        .unwrap();

    let input = common::payroll_input(common::date(2025, 4, 1), common::date(2025, 4, 30));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    let report = app.state.import.import_attendance(payroll.id).await.unwrap();
    assert_eq!(report.imported, 0);
    assert!(report.failures.is_empty());
    assert_eq!(report.import_count, 0);

    let payroll = app.state.lifecycle.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::PublicHolidaysReview);
}

#[tokio::test]
async fn test_first_import_advances_past_holidays_review() {
    common::setup_test_env();
    let profile = common::monthly_profile("Mona Rashid", dec!(26000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(
            employee_id,
            common::full_attendance(common::date(2025, 5, 1), common::date(2025, 5, 31)),
        );
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 5, 1), common::date(2025, 5, 31));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::PublicHolidaysReview);

    app.state.import.import_attendance(payroll.id).await.unwrap();
    let payroll = app.state.lifecycle.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::AttendanceImport);

    app.state.import.import_attendance(payroll.id).await.unwrap();
    let payroll = app.state.lifecycle.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::AttendanceImport);
    assert_eq!(payroll.import_count, 2);
}

#[tokio::test]
async fn test_import_applies_holiday_and_weekend_precedence() {
    common::setup_test_env();
    let profile = common::monthly_profile("Leila Hamdan", dec!(28000));
    let employee_id = profile.employee_id;

    // 2025-06-02 is a Monday; the employee is marked absent on it but a
    // paid holiday covers it.
    let mut records = common::full_attendance(common::date(2025, 6, 1), common::date(2025, 6, 30));
    for record in &mut records {
        if record.day == common::date(2025, 6, 2) {
            *record = common::absent(record.day);
        }
    }

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(employee_id, records);
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 6, 1), common::date(2025, 6, 30));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();
    app.state
        .lifecycle
        .add_public_holiday(
            payroll.id,
            &PublicHolidayInput {
                name: "Eid al-Adha".to_string(),
                start_day: common::date(2025, 6, 2),
                end_day: common::date(2025, 6, 2),
                paid: true,
            },
        )
        .await
        .unwrap();

    app.state.import.import_attendance(payroll.id).await.unwrap();
    let lines = app
        .state
        .lifecycle
        .list_employee_payrolls(payroll.id)
        .await
        .unwrap();
    assert_eq!(lines.len(), 1);
    // June 2025 has 21 weekdays; one is the holiday, none are absences.
    assert_eq!(lines[0].absent_days, Numeric::ZERO);
    assert_eq!(lines[0].holiday_days, Numeric(dec!(1)));
    assert_eq!(lines[0].worked_days, Numeric(dec!(20)));

    let snapshots = AttendanceSnapshotRepository::new(app.db.pool.clone());
    let days = snapshots.list_for_employee_payroll(lines[0].id).await.unwrap();
    let holiday = days
        .iter()
        .find(|s| s.day == common::date(2025, 6, 2))
        .unwrap();
    assert_eq!(holiday.classification, DayClassification::PublicHoliday);
    let weekend = days
        .iter()
        .find(|s| s.day == common::date(2025, 6, 1))
        .unwrap();
    assert_eq!(weekend.classification, DayClassification::Weekend);
}

#[tokio::test]
async fn test_import_is_refused_once_attendance_is_finalized() {
    common::setup_test_env();
    let actor = Uuid::new_v4();
    let profile = common::monthly_profile("Karim Odeh", dec!(23000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(
            employee_id,
            common::full_attendance(common::date(2025, 7, 1), common::date(2025, 7, 31)),
        );
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 7, 1), common::date(2025, 7, 31));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();
    app.state.import.import_attendance(payroll.id).await.unwrap();
    app.state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap();

    let err = app.state.import.import_attendance(payroll.id).await.unwrap_err();
    common::assert_state_conflict(&err);
}

#[tokio::test]
async fn test_import_report_serializes_for_api_consumers() {
    common::setup_test_env();
    let good = common::monthly_profile("Leila Haddad", dec!(21000));
    let bad = common::monthly_profile("Sami Farah", dec!(19000));
    let good_id = good.employee_id;
    let bad_id = bad.employee_id;

    let sources = common::StubSources::default()
        .with_employee(good)
        .with_employee(bad)
        .with_attendance(
            good_id,
            common::full_attendance(common::date(2025, 3, 1), common::date(2025, 3, 31)),
        )
        .with_failing(bad_id);
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 3, 1), common::date(2025, 3, 31));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();
    let report = app.state.import.import_attendance(payroll.id).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["payrollId"], serde_json::json!(payroll.id));
    assert_eq!(json["imported"], serde_json::json!(1));
    assert_eq!(json["importCount"], serde_json::json!(1));
    assert_eq!(json["failures"][0]["employeeId"], serde_json::json!(bad_id));
    assert!(json["failures"][0]["reason"].is_string());
}
