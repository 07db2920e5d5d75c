use payrun::database::models::{PaymentMethod, PayrollStatus, PublicHolidayInput};
use payrun::database::types::Numeric;
use rust_decimal_macros::dec;
use uuid::Uuid;

mod common;

#[tokio::test]
async fn test_create_payroll_rejects_inverted_period() {
    common::setup_test_env();
    let app = common::TestApp::new(common::StubSources::default())
        .await
        .unwrap();

    let input = common::payroll_input(common::date(2025, 1, 31), common::date(2025, 1, 1));
    let err = app.state.lifecycle.create_payroll(&input).await.unwrap_err();
    common::assert_validation_failure(&err);
}

#[tokio::test]
async fn test_create_payroll_rejects_overlap_without_override() {
    common::setup_test_env();
    let app = common::TestApp::new(common::StubSources::default())
        .await
        .unwrap();

    let january = common::payroll_input(common::date(2025, 1, 1), common::date(2025, 1, 31));
    app.state.lifecycle.create_payroll(&january).await.unwrap();

    let overlapping = common::payroll_input(common::date(2025, 1, 15), common::date(2025, 2, 15));
    let err = app
        .state
        .lifecycle
        .create_payroll(&overlapping)
        .await
        .unwrap_err();
    common::assert_validation_failure(&err);

    // Overriding requires a reason.
    let mut forced = overlapping.clone();
    forced.overlap_override = true;
    let err = app.state.lifecycle.create_payroll(&forced).await.unwrap_err();
    common::assert_validation_failure(&err);

    forced.overlap_reason = Some("Correction run for a mid-month rate change".to_string());
    let payroll = app.state.lifecycle.create_payroll(&forced).await.unwrap();
    assert!(payroll.overlap_override);
    assert_eq!(
        payroll.overlap_reason.as_deref(),
        Some("Correction run for a mid-month rate change")
    );
}

#[tokio::test]
async fn test_full_lifecycle_reaches_paid() {
    common::setup_test_env();
    let actor = Uuid::new_v4();
    let profile = common::monthly_profile("Lina Haddad", dec!(30000));
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
    assert_eq!(payroll.status, PayrollStatus::PublicHolidaysReview);

    let report = app.state.import.import_attendance(payroll.id).await.unwrap();
    assert_eq!(report.imported, 1);
    assert!(report.failures.is_empty());

    let payroll = app
        .state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap();
    assert_eq!(payroll.status, PayrollStatus::LeaveReview);
    assert!(payroll.attendance_finalized);
    assert_eq!(payroll.attendance_finalized_by, Some(actor));

    app.state
        .leave_review
        .process_leave_review(payroll.id)
        .await
        .unwrap();
    let payroll = app
        .state
        .lifecycle
        .finalize_leave(payroll.id, actor)
        .await
        .unwrap();
    assert_eq!(payroll.status, PayrollStatus::OvertimeReview);
    assert!(payroll.leave_finalized);

    app.state
        .leave_review
        .process_overtime_review(payroll.id)
        .await
        .unwrap();
    let payroll = app
        .state
        .lifecycle
        .confirm_and_lock(payroll.id, actor)
        .await
        .unwrap();
    assert_eq!(payroll.status, PayrollStatus::ConfirmedAndLocked);
    assert!(payroll.status.is_locked());
    assert!(payroll.overtime_finalized);

    // January 2025 has 23 weekdays; a monthly salary pays the full
    // amount regardless.
    assert_eq!(payroll.total_gross, Numeric(dec!(30000)));
    assert_eq!(payroll.total_deductions, Numeric::ZERO);
    assert_eq!(payroll.total_net, Numeric(dec!(30000)));

    let (payroll, batches) = app
        .state
        .lifecycle
        .send_to_finance(payroll.id, "Main operating account")
        .await
        .unwrap();
    assert_eq!(payroll.status, PayrollStatus::PendingFinanceReview);
    assert_eq!(payroll.payment_source.as_deref(), Some("Main operating account"));
    assert!(payroll.sent_to_finance_at.is_some());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].payment_method, PaymentMethod::BankTransfer);
    assert_eq!(batches[0].total_net, Numeric(dec!(30000)));
    assert_eq!(batches[0].employee_count, 1);

    let payroll = app.state.lifecycle.mark_paid(payroll.id).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::Paid);
    assert!(payroll.paid_at.is_some());
}

#[tokio::test]
async fn test_stage_gates_reject_out_of_order_calls() {
    common::setup_test_env();
    let actor = Uuid::new_v4();
    let app = common::TestApp::new(common::StubSources::default())
        .await
        .unwrap();

    let input = common::payroll_input(common::date(2025, 3, 1), common::date(2025, 3, 31));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    let err = app
        .state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);

    let err = app
        .state
        .lifecycle
        .finalize_leave(payroll.id, actor)
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);

    let err = app
        .state
        .lifecycle
        .confirm_and_lock(payroll.id, actor)
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);

    let err = app
        .state
        .lifecycle
        .send_to_finance(payroll.id, "Main operating account")
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);

    let err = app.state.lifecycle.mark_paid(payroll.id).await.unwrap_err();
    common::assert_state_conflict(&err);
}

#[tokio::test]
async fn test_finalize_attendance_needs_a_successful_import() {
    common::setup_test_env();
    let actor = Uuid::new_v4();
    let profile = common::monthly_profile("Omar Khalili", dec!(18000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(
            employee_id,
            common::full_attendance(common::date(2025, 2, 1), common::date(2025, 2, 28)),
        );
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 2, 1), common::date(2025, 2, 28));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    app.state.import.import_attendance(payroll.id).await.unwrap();

    // A reset leaves the payroll in the import stage with nothing
    // imported, so finalizing must fail until a fresh import runs.
    let payroll = app.state.lifecycle.reset_attendance(payroll.id).await.unwrap();
    assert_eq!(payroll.status, PayrollStatus::AttendanceImport);
    assert_eq!(payroll.import_count, 0);

    let err = app
        .state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);

    app.state.import.import_attendance(payroll.id).await.unwrap();
    let payroll = app
        .state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap();
    assert_eq!(payroll.status, PayrollStatus::LeaveReview);
}

#[tokio::test]
async fn test_finalizing_attendance_twice_conflicts() {
    common::setup_test_env();
    let actor = Uuid::new_v4();
    let profile = common::monthly_profile("Sara Mansour", dec!(21000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(
            employee_id,
            common::full_attendance(common::date(2025, 4, 1), common::date(2025, 4, 30)),
        );
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 4, 1), common::date(2025, 4, 30));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();
    app.state.import.import_attendance(payroll.id).await.unwrap();
    app.state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap();

    let err = app
        .state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);
}

#[tokio::test]
async fn test_public_holidays_are_validated_and_lock_with_attendance() {
    common::setup_test_env();
    let actor = Uuid::new_v4();
    let profile = common::monthly_profile("Nadia Attar", dec!(25000));
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

    let err = app
        .state
        .lifecycle
        .add_public_holiday(
            payroll.id,
            &PublicHolidayInput {
                name: "  ".to_string(),
                start_day: common::date(2025, 5, 1),
                end_day: common::date(2025, 5, 1),
                paid: true,
            },
        )
        .await
        .unwrap_err();
    common::assert_validation_failure(&err);

    let err = app
        .state
        .lifecycle
        .add_public_holiday(
            payroll.id,
            &PublicHolidayInput {
                name: "Eid".to_string(),
                start_day: common::date(2025, 4, 30),
                end_day: common::date(2025, 5, 2),
                paid: true,
            },
        )
        .await
        .unwrap_err();
    common::assert_validation_failure(&err);

    let holiday = app
        .state
        .lifecycle
        .add_public_holiday(
            payroll.id,
            &PublicHolidayInput {
                name: "Labour Day".to_string(),
                start_day: common::date(2025, 5, 1),
                end_day: common::date(2025, 5, 1),
                paid: true,
            },
        )
        .await
        .unwrap();

    let holidays = app
        .state
        .lifecycle
        .list_public_holidays(payroll.id)
        .await
        .unwrap();
    assert_eq!(holidays.len(), 1);

    app.state
        .lifecycle
        .remove_public_holiday(payroll.id, holiday.id)
        .await
        .unwrap();
    let err = app
        .state
        .lifecycle
        .remove_public_holiday(payroll.id, holiday.id)
        .await
        .unwrap_err();
    match err.downcast_ref::<payrun::AppError>() {
        Some(payrun::AppError::NotFound(_)) => {}
        other => panic!("expected not found, got {:?}", other),
    }

    app.state.import.import_attendance(payroll.id).await.unwrap();
    app.state
        .lifecycle
        .finalize_attendance(payroll.id, actor)
        .await
        .unwrap();

    let err = app
        .state
        .lifecycle
        .add_public_holiday(
            payroll.id,
            &PublicHolidayInput {
                name: "Late addition".to_string(),
                start_day: common::date(2025, 5, 20),
                end_day: common::date(2025, 5, 20),
                paid: false,
            },
        )
        .await
        .unwrap_err();
    common::assert_state_conflict(&err);
}

#[tokio::test]
async fn test_reset_attendance_clears_lines_and_counters() {
    common::setup_test_env();
    let profile = common::monthly_profile("Rami Saleh", dec!(16000));
    let employee_id = profile.employee_id;

    let sources = common::StubSources::default()
        .with_employee(profile)
        .with_attendance(
            employee_id,
            common::full_attendance(common::date(2025, 6, 1), common::date(2025, 6, 30)),
        );
    let app = common::TestApp::new(sources).await.unwrap();

    let input = common::payroll_input(common::date(2025, 6, 1), common::date(2025, 6, 30));
    let payroll = app.state.lifecycle.create_payroll(&input).await.unwrap();

    app.state.import.import_attendance(payroll.id).await.unwrap();
    let payroll = app.state.lifecycle.get_payroll(payroll.id).await.unwrap();
    assert_eq!(payroll.employee_count, 1);
    assert_eq!(payroll.import_count, 1);
    assert!(payroll.last_imported_at.is_some());

    let payroll = app.state.lifecycle.reset_attendance(payroll.id).await.unwrap();
    assert_eq!(payroll.employee_count, 0);
    assert_eq!(payroll.import_count, 0);
    assert!(payroll.last_imported_at.is_none());
    assert_eq!(payroll.status, PayrollStatus::AttendanceImport);

    let lines = app
        .state
        .lifecycle
        .list_employee_payrolls(payroll.id)
        .await
        .unwrap();
    assert!(lines.is_empty());
}
