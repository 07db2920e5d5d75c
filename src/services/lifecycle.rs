use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::{
    CreatePayrollInput, DateRange, DeductionCategory, DeductionFrequency, DeductionType,
    EmployeeDeduction, EmployeePayroll, NewPayrollDeduction, Payroll, PayrollBatch,
    PayrollDeduction, PayrollPublicHoliday, PayrollStatus, PublicHolidayInput,
};
use crate::database::repositories::{
    DeductionRepository, EmployeePayrollRepository, LoanRepository, PayrollDeductionRepository,
    PayrollRepository,
};
use crate::database::types::Numeric;
use crate::engine::{amortization, deduction, totals};
use crate::error::AppError;
use crate::services::batches::PaymentBatchService;
use crate::services::sources::NotificationSink;

/// Drives a payroll through its one-way lifecycle and owns the one-shot
/// confirmation pipeline. Every stage gate is checked here; repositories
/// only guard against stale versions.
#[derive(Clone)]
pub struct PayrollLifecycleService {
    pool: SqlitePool,
    payrolls: PayrollRepository,
    employee_payrolls: EmployeePayrollRepository,
    payroll_deductions: PayrollDeductionRepository,
    deductions: DeductionRepository,
    loans: LoanRepository,
    batches: PaymentBatchService,
    notifier: Arc<dyn NotificationSink>,
}

impl PayrollLifecycleService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        payrolls: PayrollRepository,
        employee_payrolls: EmployeePayrollRepository,
        payroll_deductions: PayrollDeductionRepository,
        deductions: DeductionRepository,
        loans: LoanRepository,
        batches: PaymentBatchService,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            pool,
            payrolls,
            employee_payrolls,
            payroll_deductions,
            deductions,
            loans,
            batches,
            notifier,
        }
    }

    pub async fn create_payroll(&self, input: &CreatePayrollInput) -> Result<Payroll> {
        if input.period_start > input.period_end {
            return Err(AppError::validation("period start must not be after period end").into());
        }
        if input.overlap_override
            && input
                .overlap_reason
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty()
        {
            return Err(AppError::validation("overlap override requires a reason").into());
        }

        let range = DateRange::new(input.period_start, input.period_end);
        let overlapping = self.payrolls.find_overlapping(&range).await?;
        if !overlapping.is_empty() && !input.overlap_override {
            return Err(AppError::validation(format!(
                "period overlaps {} existing payroll(s)",
                overlapping.len()
            ))
            .into());
        }

        let payroll = self.payrolls.create(input).await?;
        log::info!(
            "Created payroll {} for {} to {}",
            payroll.id,
            payroll.period_start,
            payroll.period_end
        );
        Ok(payroll)
    }

    pub async fn get_payroll(&self, payroll_id: Uuid) -> Result<Payroll> {
        let payroll = self
            .payrolls
            .find_by_id(payroll_id)
            .await?
            .ok_or_else(|| AppError::not_found("payroll", payroll_id))?;
        Ok(payroll)
    }

    pub async fn list_payrolls(&self) -> Result<Vec<Payroll>> {
        self.payrolls.list().await
    }

    pub async fn add_public_holiday(
        &self,
        payroll_id: Uuid,
        input: &PublicHolidayInput,
    ) -> Result<PayrollPublicHoliday> {
        let payroll = self.get_payroll(payroll_id).await?;
        ensure_holidays_editable(&payroll)?;

        if input.name.trim().is_empty() {
            return Err(AppError::validation("holiday name cannot be empty").into());
        }
        if input.start_day > input.end_day {
            return Err(AppError::validation("holiday start must not be after its end").into());
        }
        let period = payroll.period();
        if !period.contains(input.start_day) || !period.contains(input.end_day) {
            return Err(
                AppError::validation("holiday must fall inside the payroll period").into(),
            );
        }

        self.payrolls.add_holiday(payroll.id, input).await
    }

    pub async fn remove_public_holiday(&self, payroll_id: Uuid, holiday_id: Uuid) -> Result<()> {
        let payroll = self.get_payroll(payroll_id).await?;
        ensure_holidays_editable(&payroll)?;

        if !self.payrolls.remove_holiday(payroll.id, holiday_id).await? {
            return Err(AppError::not_found("public holiday", holiday_id).into());
        }
        Ok(())
    }

    pub async fn list_public_holidays(&self, payroll_id: Uuid) -> Result<Vec<PayrollPublicHoliday>> {
        let payroll = self.get_payroll(payroll_id).await?;
        self.payrolls.list_holidays(payroll.id).await
    }

    pub async fn list_employee_payrolls(&self, payroll_id: Uuid) -> Result<Vec<EmployeePayroll>> {
        let payroll = self.get_payroll(payroll_id).await?;
        self.employee_payrolls.list_for_payroll(payroll.id).await
    }

    pub async fn list_payroll_deductions(&self, payroll_id: Uuid) -> Result<Vec<PayrollDeduction>> {
        let payroll = self.get_payroll(payroll_id).await?;
        self.payroll_deductions.list_for_payroll(payroll.id).await
    }

    /// Close the attendance stage. Requires at least one successful
    /// import; writes the write-once audit pair and moves to leave
    /// review.
    pub async fn finalize_attendance(&self, payroll_id: Uuid, actor: Uuid) -> Result<Payroll> {
        let payroll = self.get_payroll(payroll_id).await?;
        if payroll.attendance_finalized {
            return Err(AppError::state_conflict(format!(
                "payroll {} attendance is already finalized",
                payroll.id
            ))
            .into());
        }
        if payroll.status != PayrollStatus::AttendanceImport {
            return Err(AppError::state_conflict(format!(
                "payroll {} cannot finalize attendance in status {}",
                payroll.id, payroll.status
            ))
            .into());
        }
        if payroll.import_count == 0 {
            return Err(AppError::state_conflict(format!(
                "payroll {} has no successful attendance import",
                payroll.id
            ))
            .into());
        }

        let updated = self
            .payrolls
            .finalize_attendance(&payroll, actor, Utc::now())
            .await?;
        self.notify_finalized(&updated, "attendance", actor).await;
        Ok(updated)
    }

    pub async fn finalize_leave(&self, payroll_id: Uuid, actor: Uuid) -> Result<Payroll> {
        let payroll = self.get_payroll(payroll_id).await?;
        if payroll.leave_finalized {
            return Err(AppError::state_conflict(format!(
                "payroll {} leave review is already finalized",
                payroll.id
            ))
            .into());
        }
        if payroll.status != PayrollStatus::LeaveReview {
            return Err(AppError::state_conflict(format!(
                "payroll {} cannot finalize leave in status {}",
                payroll.id, payroll.status
            ))
            .into());
        }

        let updated = self.payrolls.finalize_leave(&payroll, actor, Utc::now()).await?;
        self.notify_finalized(&updated, "leave", actor).await;
        Ok(updated)
    }

    /// The overtime finalize. Applies every deduction exactly once, in
    /// one transaction: attendance charges, then loan installments, then
    /// recurring assignments by priority against the running net. Locks
    /// the payroll on commit.
    pub async fn confirm_and_lock(&self, payroll_id: Uuid, actor: Uuid) -> Result<Payroll> {
        let payroll = self.get_payroll(payroll_id).await?;
        if payroll.status != PayrollStatus::OvertimeReview {
            return Err(AppError::state_conflict(format!(
                "payroll {} cannot be confirmed in status {}",
                payroll.id, payroll.status
            ))
            .into());
        }

        let period = payroll.period();
        let lines = self.employee_payrolls.list_for_payroll(payroll.id).await?;

        // Per-employee context is read before the write transaction.
        let mut contexts = Vec::with_capacity(lines.len());
        for line in lines {
            let assignments = self
                .deductions
                .list_active_for_employee(line.employee_id)
                .await?;
            let loans = self.loans.list_active_for_employee(line.employee_id).await?;
            contexts.push((line, assignments, loans));
        }

        let mut types: HashMap<Uuid, DeductionType> = HashMap::new();
        for (_, assignments, _) in &contexts {
            for assignment in assignments {
                if types.contains_key(&assignment.deduction_type_id) {
                    continue;
                }
                let deduction_type = self
                    .deductions
                    .find_type(assignment.deduction_type_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::not_found("deduction type", assignment.deduction_type_id)
                    })?;
                types.insert(deduction_type.id, deduction_type);
            }
        }

        let now = Utc::now();
        let mut payroll_gross = Numeric::ZERO;
        let mut payroll_deduction_total = Numeric::ZERO;
        let mut payroll_net = Numeric::ZERO;

        let mut tx = self.pool.begin().await?;

        for (line, assignments, loans) in &contexts {
            let basic = totals::basic_pay(line);
            let gross = totals::gross_pay(line);
            let mut net = gross;
            let mut rows: Vec<NewPayrollDeduction> = Vec::new();

            for (category, label, amount) in [
                (
                    DeductionCategory::Absence,
                    "Absence",
                    (line.absent_days * line.absence_charge).round2(),
                ),
                (
                    DeductionCategory::Late,
                    "Late arrival",
                    (line.late_days * line.late_charge).round2(),
                ),
                (
                    DeductionCategory::ExcessLeave,
                    "Excess leave",
                    (line.excess_leave_days * line.excess_leave_charge).round2(),
                ),
            ] {
                if amount.is_positive() {
                    rows.push(NewPayrollDeduction {
                        employee_payroll_id: line.id,
                        category,
                        label: label.to_string(),
                        amount,
                        deduction_type_id: None,
                        loan_id: None,
                    });
                    net -= amount;
                }
            }

            // Active loans take one installment each, oldest first,
            // clamped to the remaining balance.
            for loan in loans {
                let installment = amortization::next_installment(loan);
                if !installment.is_positive() {
                    continue;
                }
                LoanRepository::record_payment_with(&mut tx, loan, installment, Some(line.id), now)
                    .await?;
                rows.push(NewPayrollDeduction {
                    employee_payroll_id: line.id,
                    category: DeductionCategory::Loan,
                    label: "Loan installment".to_string(),
                    amount: installment,
                    deduction_type_id: None,
                    loan_id: Some(loan.id),
                });
                net -= installment;
            }

            let applied = deduction::apply_in_priority_order(assignments, &period, gross, basic, net);
            let by_id: HashMap<Uuid, &EmployeeDeduction> =
                assignments.iter().map(|a| (a.id, a)).collect();
            for application in &applied {
                let Some(assignment) = by_id.get(&application.assignment_id) else {
                    continue;
                };
                let deactivate = assignment.frequency == DeductionFrequency::OneTime;
                DeductionRepository::record_application_with(
                    &mut tx,
                    assignment,
                    application.amount,
                    period.end,
                    deactivate,
                )
                .await?;

                let deduction_type = types
                    .get(&assignment.deduction_type_id)
                    .ok_or_else(|| {
                        AppError::not_found("deduction type", assignment.deduction_type_id)
                    })?;
                rows.push(NewPayrollDeduction {
                    employee_payroll_id: line.id,
                    category: deduction_type.category,
                    label: deduction_type.name.clone(),
                    amount: application.amount,
                    deduction_type_id: Some(deduction_type.id),
                    loan_id: None,
                });
            }

            let mut total = Numeric::ZERO;
            for row in &rows {
                PayrollDeductionRepository::insert_with(&mut tx, row, now).await?;
                total += row.amount;
            }
            let net_pay = gross - total;
            EmployeePayrollRepository::update_totals_with(&mut tx, line, gross, total, net_pay)
                .await?;

            payroll_gross += gross;
            payroll_deduction_total += total;
            payroll_net += net_pay;
        }

        let confirmed = PayrollRepository::confirm_with(
            &mut tx,
            &payroll,
            actor,
            now,
            payroll_gross,
            payroll_deduction_total,
            payroll_net,
        )
        .await?;
        tx.commit().await?;

        log::info!(
            "Payroll {} confirmed and locked: gross {}, deductions {}, net {}",
            confirmed.id,
            confirmed.total_gross,
            confirmed.total_deductions,
            confirmed.total_net
        );
        self.notify_finalized(&confirmed, "overtime", actor).await;
        Ok(confirmed)
    }

    /// Fold the persisted rows back into line and payroll totals. Safe
    /// to run at any stage before the finance handoff; running it twice
    /// produces identical figures.
    pub async fn recalculate_totals(&self, payroll_id: Uuid) -> Result<Payroll> {
        let payroll = self.get_payroll(payroll_id).await?;
        if matches!(
            payroll.status,
            PayrollStatus::PendingFinanceReview | PayrollStatus::Paid
        ) {
            return Err(AppError::state_conflict(format!(
                "payroll {} totals are frozen after the finance handoff",
                payroll.id
            ))
            .into());
        }

        let lines = self.employee_payrolls.list_for_payroll(payroll.id).await?;
        let mut folded = Vec::with_capacity(lines.len());
        for line in &lines {
            let rows = self
                .payroll_deductions
                .list_for_employee_payroll(line.id)
                .await?;
            let line_totals = totals::employee_totals(line, &rows);
            self.employee_payrolls
                .update_totals(
                    line,
                    line_totals.gross_pay,
                    line_totals.total_deductions,
                    line_totals.net_pay,
                )
                .await?;
            folded.push(line_totals);
        }

        let sums = totals::payroll_totals(&folded);
        self.payrolls
            .update_totals(&payroll, sums.gross, sums.deductions, sums.net)
            .await
    }

    /// Split payment batches and hand the payroll to finance, in one
    /// transaction.
    pub async fn send_to_finance(
        &self,
        payroll_id: Uuid,
        payment_source: &str,
    ) -> Result<(Payroll, Vec<PayrollBatch>)> {
        let payroll = self.get_payroll(payroll_id).await?;
        if payroll.status != PayrollStatus::ConfirmedAndLocked {
            return Err(AppError::state_conflict(format!(
                "payroll {} cannot be sent to finance in status {}",
                payroll.id, payroll.status
            ))
            .into());
        }
        let payment_source = payment_source.trim();
        if payment_source.is_empty() {
            return Err(AppError::validation("payment source cannot be empty").into());
        }
        self.batches.ensure_not_split(payroll.id).await?;

        let lines = self.employee_payrolls.list_for_payroll(payroll.id).await?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;
        let batches = PaymentBatchService::split_with(&mut tx, payroll.id, &lines, now).await?;
        let updated =
            PayrollRepository::send_to_finance_with(&mut tx, &payroll, payment_source, now).await?;
        tx.commit().await?;

        log::info!(
            "Payroll {} sent to finance via {} in {} batch(es)",
            payroll.id,
            payment_source,
            batches.len()
        );
        Ok((updated, batches))
    }

    pub async fn mark_paid(&self, payroll_id: Uuid) -> Result<Payroll> {
        let payroll = self.get_payroll(payroll_id).await?;
        if payroll.status != PayrollStatus::PendingFinanceReview {
            return Err(AppError::state_conflict(format!(
                "payroll {} cannot be marked paid in status {}",
                payroll.id, payroll.status
            ))
            .into());
        }
        self.payrolls.mark_paid(&payroll, Utc::now()).await
    }

    /// Throw away every imported line and start the attendance stage
    /// over. Closed once attendance is finalized.
    pub async fn reset_attendance(&self, payroll_id: Uuid) -> Result<Payroll> {
        let payroll = self.get_payroll(payroll_id).await?;
        if payroll.attendance_finalized {
            return Err(AppError::state_conflict(format!(
                "payroll {} attendance is already finalized",
                payroll.id
            ))
            .into());
        }
        match payroll.status {
            PayrollStatus::PublicHolidaysReview | PayrollStatus::AttendanceImport => {}
            status => {
                return Err(AppError::state_conflict(format!(
                    "payroll {} cannot reset attendance in status {}",
                    payroll.id, status
                ))
                .into());
            }
        }
        self.payrolls.reset_import(&payroll).await
    }

    async fn notify_finalized(&self, payroll: &Payroll, stage: &str, actor: Uuid) {
        if let Err(e) = self.notifier.notify_finalized(payroll.id, stage, actor).await {
            log::warn!(
                "Payroll {} {} finalize notice failed: {}",
                payroll.id,
                stage,
                e
            );
        }
    }
}

fn ensure_holidays_editable(payroll: &Payroll) -> Result<()> {
    if payroll.attendance_finalized {
        return Err(AppError::state_conflict(format!(
            "payroll {} attendance is already finalized",
            payroll.id
        ))
        .into());
    }
    match payroll.status {
        PayrollStatus::PublicHolidaysReview | PayrollStatus::AttendanceImport => Ok(()),
        status => Err(AppError::state_conflict(format!(
            "payroll {} holidays cannot change in status {}",
            payroll.id, status
        ))
        .into()),
    }
}
