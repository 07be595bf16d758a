//! Monthly payroll: attendance aggregation, pay computation and the payroll lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use uuid::Uuid;

use super::violations::require_manager;
use crate::config::{DetectionConfig, PayrollConfig};
use crate::database::models::{
    AttendanceLog, AttendanceSummary, BatchResult, DepartmentPayrollSummary, EarnerSummary,
    MonthlyTrend, Payroll, PayrollFilter, PayrollPeriod, PayrollStatistics, PayrollStatus,
    PayrollValidation, PayrollWrite, PeriodComparison, SalaryStructure, SalaryType,
    ScheduledShift, UserProfile, YearlyPayrollSummary, round_currency,
};
use crate::database::repositories::{
    AttendanceRepository, IdentityDirectory, PayrollRepository, SalaryStructureRepository,
    ShiftRepository,
};
use crate::error::AppError;

const MAX_TREND_MONTHS: u32 = 24;

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn sum<'a>(values: impl Iterator<Item = &'a BigDecimal>) -> BigDecimal {
    values.fold(BigDecimal::zero(), |acc, value| acc + value)
}

/// Weekdays of the period that are not configured holidays
pub fn working_days_in(period: PayrollPeriod, config: &PayrollConfig) -> Result<i32, AppError> {
    let end = period.end()?;
    let mut date = period.start()?;
    let mut days = 0;

    while date <= end {
        if !is_weekend(date) && !config.is_holiday(date) {
            days += 1;
        }
        date += Duration::days(1);
    }

    Ok(days)
}

/// Paid hours of one log: worked time minus the lunch break once it is exceeded
fn paid_hours(log: &AttendanceLog, config: &PayrollConfig) -> BigDecimal {
    let mut minutes = log.worked_minutes();
    if minutes > config.lunch_break_minutes {
        minutes -= config.lunch_break_minutes;
    }
    round_currency(
        &(BigDecimal::from(minutes) / BigDecimal::from(60)),
        config.currency_scale,
    )
}

/// Aggregate a period's logs, each paired with the shift it was expected against.
pub fn summarize_attendance(
    period: PayrollPeriod,
    logs: &[(AttendanceLog, Option<ScheduledShift>)],
    config: &PayrollConfig,
    detection: &DetectionConfig,
) -> Result<AttendanceSummary, AppError> {
    let mut summary = AttendanceSummary {
        total_working_days: working_days_in(period, config)?,
        ..AttendanceSummary::default()
    };
    let standard_hours = BigDecimal::from(config.standard_hours_per_day);

    for (log, shift) in logs {
        summary.actual_working_days += 1;

        let hours = paid_hours(log, config);
        if config.is_holiday(log.log_date) {
            summary.holiday_hours += hours;
        } else if is_weekend(log.log_date) {
            summary.weekend_hours += hours;
        } else if hours > standard_hours {
            summary.overtime_hours += &hours - &standard_hours;
            summary.regular_hours += &standard_hours;
        } else {
            summary.regular_hours += hours;
        }

        if let Some(shift) = shift {
            if log.is_late(
                shift.expected_start(log.log_date),
                detection.late_tolerance_minutes,
            ) {
                summary.late_arrivals += 1;
            }
            if log.is_early_departure(
                shift.expected_end(log.log_date),
                detection.early_tolerance_minutes,
            ) {
                summary.early_departures += 1;
            }
        }
    }

    summary.absent_days = (summary.total_working_days - summary.actual_working_days).max(0);
    summary.leave_days = 0;

    Ok(summary)
}

/// Build a Calculated payroll from a structure and an attendance summary.
///
/// Every component is rounded to the currency scale before the totals are summed, so
/// `net = gross - total_deductions` holds exactly.
pub fn compute_payroll(
    user_id: Uuid,
    period: PayrollPeriod,
    structure: &SalaryStructure,
    summary: &AttendanceSummary,
    config: &PayrollConfig,
    calculated_by: Option<Uuid>,
) -> Result<Payroll, AppError> {
    let scale = config.currency_scale;
    let round = |value: BigDecimal| round_currency(&value, scale);
    let base = &structure.base_salary;

    let hourly_equivalent = structure.hourly_rate.clone().unwrap_or_else(|| {
        base / BigDecimal::from(config.standard_days_per_month * config.standard_hours_per_day)
    });

    let regular_pay = match structure.salary_type {
        SalaryType::Monthly if summary.total_working_days > 0 => round(
            base * BigDecimal::from(summary.actual_working_days)
                / BigDecimal::from(summary.total_working_days),
        ),
        SalaryType::Monthly => BigDecimal::zero(),
        SalaryType::Hourly => round(&summary.regular_hours * &hourly_equivalent),
        SalaryType::Daily => round(
            BigDecimal::from(summary.actual_working_days) * base
                / BigDecimal::from(config.standard_days_per_month),
        ),
    };

    let rate_or = |rate: &Option<BigDecimal>, multiplier: &BigDecimal| {
        rate.clone()
            .unwrap_or_else(|| multiplier * &hourly_equivalent)
    };
    let overtime_pay = round(
        &summary.overtime_hours * rate_or(&structure.overtime_rate, &config.overtime_multiplier),
    );
    let weekend_pay = round(
        &summary.weekend_hours * rate_or(&structure.weekend_rate, &config.weekend_multiplier),
    );
    let holiday_pay = round(
        &summary.holiday_hours * rate_or(&structure.holiday_rate, &config.holiday_multiplier),
    );

    let now = Utc::now();
    let mut payroll = Payroll {
        id: Uuid::new_v4(),
        user_id,
        salary_structure_id: structure.id,
        payroll_year: period.year,
        payroll_month: period.month as i32,
        period_start: period.start()?,
        period_end: period.end()?,

        total_working_days: 0,
        actual_working_days: 0,
        regular_hours: BigDecimal::zero(),
        overtime_hours: BigDecimal::zero(),
        holiday_hours: BigDecimal::zero(),
        weekend_hours: BigDecimal::zero(),
        late_arrivals: 0,
        early_departures: 0,
        absent_days: 0,
        leave_days: 0,

        base_salary: base.clone(),
        regular_pay,
        overtime_pay,
        holiday_pay,
        weekend_pay,
        transport_allowance: round(structure.transport_allowance.clone()),
        meal_allowance: round(structure.meal_allowance.clone()),
        phone_allowance: round(structure.phone_allowance.clone()),
        other_allowances: round(structure.other_allowances.clone()),
        social_insurance: round(base * &structure.social_insurance_rate),
        health_insurance: round(base * &structure.health_insurance_rate),
        unemployment_insurance: round(base * &structure.unemployment_insurance_rate),
        personal_income_tax: round(structure.personal_income_tax.clone()),
        late_penalty: round(
            base * &config.late_penalty_rate * BigDecimal::from(summary.late_arrivals),
        ),
        absent_penalty: round(
            base * &config.absent_penalty_rate * BigDecimal::from(summary.absent_days),
        ),
        other_deductions: round(structure.other_deductions.clone()),

        gross_salary: BigDecimal::zero(),
        total_deductions: BigDecimal::zero(),
        net_salary: BigDecimal::zero(),

        status: PayrollStatus::Calculated,
        notes: None,
        calculated_at: Some(now),
        calculated_by,
        approved_at: None,
        approved_by: None,
        paid_at: None,
        paid_by: None,
        created_at: now,
        updated_at: now,
    };

    payroll.apply_attendance(summary);
    payroll.recalculate_totals();
    Ok(payroll)
}

/// Consistency checks over a computed payroll
pub fn validate_payroll(payroll: &Payroll, config: &PayrollConfig) -> PayrollValidation {
    let mut validation = PayrollValidation {
        payroll_id: Some(payroll.id),
        ..PayrollValidation::default()
    };

    if payroll.net_salary < BigDecimal::zero() {
        validation
            .errors
            .push(format!("Net salary is negative: {}", payroll.net_salary));
    }
    if payroll.actual_working_days > payroll.total_working_days {
        validation.errors.push(format!(
            "Actual working days ({}) exceed total working days ({})",
            payroll.actual_working_days, payroll.total_working_days
        ));
    }
    if payroll.total_deductions > payroll.gross_salary {
        validation.warnings.push(format!(
            "Total deductions ({}) exceed gross salary ({})",
            payroll.total_deductions, payroll.gross_salary
        ));
    }
    if payroll.overtime_hours > BigDecimal::from(config.overtime_warning_hours) {
        validation.warnings.push(format!(
            "Overtime of {} hours exceeds {} hours",
            payroll.overtime_hours, config.overtime_warning_hours
        ));
    }

    validation
}

fn percent_change(current: &BigDecimal, previous: &BigDecimal) -> Option<BigDecimal> {
    if previous.is_zero() {
        return None;
    }
    Some(round_currency(
        &((current - previous) * BigDecimal::from(100) / previous),
        2,
    ))
}

#[derive(Clone)]
pub struct PayrollService {
    payrolls: Arc<dyn PayrollRepository>,
    structures: Arc<dyn SalaryStructureRepository>,
    attendance: Arc<dyn AttendanceRepository>,
    shifts: Arc<dyn ShiftRepository>,
    identity: Arc<dyn IdentityDirectory>,
    config: PayrollConfig,
    detection: DetectionConfig,
}

impl PayrollService {
    pub fn new(
        payrolls: Arc<dyn PayrollRepository>,
        structures: Arc<dyn SalaryStructureRepository>,
        attendance: Arc<dyn AttendanceRepository>,
        shifts: Arc<dyn ShiftRepository>,
        identity: Arc<dyn IdentityDirectory>,
        config: PayrollConfig,
        detection: DetectionConfig,
    ) -> Self {
        Self {
            payrolls,
            structures,
            attendance,
            shifts,
            identity,
            config,
            detection,
        }
    }

    async fn load(&self, id: Uuid) -> Result<Payroll, AppError> {
        self.payrolls
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Payroll", id))
    }

    fn concurrent_change(id: Uuid) -> AppError {
        AppError::Conflict(format!("Payroll {} was modified concurrently", id))
    }

    pub async fn attendance_summary(
        &self,
        user_id: Uuid,
        period: PayrollPeriod,
    ) -> Result<AttendanceSummary, AppError> {
        let logs = self
            .attendance
            .list_for_user_between(user_id, period.start()?, period.end()?)
            .await?;

        let mut paired = Vec::with_capacity(logs.len());
        for log in logs {
            let shift = self
                .shifts
                .scheduled_shift_for_user_on(user_id, log.log_date)
                .await?;
            paired.push((log, shift));
        }

        summarize_attendance(period, &paired, &self.config, &self.detection)
    }

    async fn structure_for(
        &self,
        user_id: Uuid,
        period: PayrollPeriod,
    ) -> Result<SalaryStructure, AppError> {
        let period_start = period.start()?;
        self.structures
            .active_for(user_id, period_start)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "No active salary structure for user {} at {}",
                    user_id, period_start
                ))
            })
    }

    /// Calculate and store the payroll of one user for a period.
    ///
    /// A payroll that already left Draft is returned unchanged.
    pub async fn calculate_for_user(
        &self,
        user_id: Uuid,
        period: PayrollPeriod,
        actor: &UserProfile,
    ) -> Result<Payroll, AppError> {
        require_manager(actor)?;

        if let Some(existing) = self.payrolls.find_for_period(user_id, period).await? {
            if existing.status != PayrollStatus::Draft {
                log::info!(
                    "Payroll for user {} in {} is already {}, leaving it unchanged",
                    user_id,
                    period,
                    existing.status
                );
                return Ok(existing);
            }
        }

        let structure = self.structure_for(user_id, period).await?;
        let summary = self.attendance_summary(user_id, period).await?;
        let payroll = compute_payroll(
            user_id,
            period,
            &structure,
            &summary,
            &self.config,
            Some(actor.id),
        )?;

        match self.payrolls.save_calculated(&payroll).await? {
            PayrollWrite::Written(written) => {
                log::info!(
                    "Calculated payroll {} for user {} in {}: net {}",
                    written.id,
                    user_id,
                    period,
                    written.net_salary
                );
                Ok(written)
            }
            PayrollWrite::Existing(existing) => {
                log::info!(
                    "Payroll for user {} in {} was finalised concurrently",
                    user_id,
                    period
                );
                Ok(existing)
            }
        }
    }

    pub async fn bulk_calculate(
        &self,
        user_ids: Vec<Uuid>,
        period: PayrollPeriod,
        actor: &UserProfile,
    ) -> Result<BatchResult<Payroll>, AppError> {
        require_manager(actor)?;
        log::info!(
            "Calculating payroll for {} users in {}",
            user_ids.len(),
            period
        );

        let mut result = BatchResult::default();
        for user_id in user_ids {
            match self.calculate_for_user(user_id, period, actor).await {
                Ok(payroll) => result.succeeded.push(payroll),
                Err(e) => {
                    log::warn!("Payroll for user {} in {} failed: {}", user_id, period, e);
                    result.record_failure(user_id, e);
                }
            }
        }

        log::info!(
            "Bulk payroll for {} finished: {} succeeded, {} failed",
            period,
            result.succeeded.len(),
            result.failed.len()
        );
        Ok(result)
    }

    /// Recompute a Draft or Calculated payroll from current attendance and structure
    pub async fn recalculate(&self, id: Uuid, actor: &UserProfile) -> Result<Payroll, AppError> {
        require_manager(actor)?;

        let existing = self.load(id).await?;
        if !existing.can_be_edited() {
            return Err(AppError::Conflict(format!(
                "Payroll {} cannot be recalculated while {}",
                id, existing.status
            )));
        }

        let period = existing.period();
        let structure = self.structure_for(existing.user_id, period).await?;
        let summary = self.attendance_summary(existing.user_id, period).await?;
        let mut payroll = compute_payroll(
            existing.user_id,
            period,
            &structure,
            &summary,
            &self.config,
            Some(actor.id),
        )?;
        payroll.id = existing.id;
        payroll.created_at = existing.created_at;
        payroll.notes = existing.notes.clone();

        self.payrolls
            .save_transition(&payroll, existing.status)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))
    }

    pub async fn approve(&self, id: Uuid, actor: &UserProfile) -> Result<Payroll, AppError> {
        require_manager(actor)?;

        let mut payroll = self.load(id).await?;
        let previous = payroll.transition_to(PayrollStatus::Approved)?;
        payroll.approved_at = Some(Utc::now());
        payroll.approved_by = Some(actor.id);

        self.payrolls
            .save_transition(&payroll, previous)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))
    }

    pub async fn bulk_approve(
        &self,
        ids: Vec<Uuid>,
        actor: &UserProfile,
    ) -> Result<BatchResult<Payroll>, AppError> {
        require_manager(actor)?;

        let mut result = BatchResult::default();
        for id in ids {
            match self.approve(id, actor).await {
                Ok(payroll) => result.succeeded.push(payroll),
                Err(e) => {
                    log::warn!("Approving payroll {} failed: {}", id, e);
                    result.record_failure(id, e);
                }
            }
        }
        Ok(result)
    }

    pub async fn mark_paid(&self, id: Uuid, actor: &UserProfile) -> Result<Payroll, AppError> {
        require_manager(actor)?;

        let mut payroll = self.load(id).await?;
        let previous = payroll.transition_to(PayrollStatus::Paid)?;
        payroll.paid_at = Some(Utc::now());
        payroll.paid_by = Some(actor.id);

        self.payrolls
            .save_transition(&payroll, previous)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        actor: &UserProfile,
        reason: Option<String>,
    ) -> Result<Payroll, AppError> {
        require_manager(actor)?;

        let mut payroll = self.load(id).await?;
        let previous = payroll.transition_to(PayrollStatus::Cancelled)?;
        if reason.is_some() {
            payroll.notes = reason;
        }

        self.payrolls
            .save_transition(&payroll, previous)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))
    }

    pub async fn get(&self, id: Uuid, actor: &UserProfile) -> Result<Payroll, AppError> {
        let payroll = self.load(id).await?;
        if !actor.can_access_user_resource(payroll.user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own payroll".to_string(),
            ));
        }
        Ok(payroll)
    }

    pub async fn list(
        &self,
        mut filter: PayrollFilter,
        actor: &UserProfile,
    ) -> Result<Vec<Payroll>, AppError> {
        if !actor.is_manager_or_admin() {
            filter.user_id = Some(actor.id);
        }
        Ok(self.payrolls.list(&filter).await?)
    }

    pub async fn validate(
        &self,
        id: Uuid,
        actor: &UserProfile,
    ) -> Result<PayrollValidation, AppError> {
        let payroll = self.get(id, actor).await?;
        Ok(validate_payroll(&payroll, &self.config))
    }

    async fn period_payrolls(&self, period: PayrollPeriod) -> Result<Vec<Payroll>, AppError> {
        Ok(self.payrolls.list(&PayrollFilter::for_period(period)).await?)
    }

    fn average(&self, total: &BigDecimal, count: usize) -> BigDecimal {
        if count == 0 {
            return BigDecimal::zero();
        }
        round_currency(&(total / BigDecimal::from(count as u64)), self.config.currency_scale)
    }

    fn statistics_for(&self, period: PayrollPeriod, payrolls: &[Payroll]) -> PayrollStatistics {
        let mut counts_by_status = BTreeMap::new();
        for payroll in payrolls {
            *counts_by_status
                .entry(payroll.status.to_string())
                .or_insert(0) += 1;
        }

        let counted: Vec<&Payroll> = payrolls
            .iter()
            .filter(|p| p.status != PayrollStatus::Cancelled)
            .collect();
        let total_net = sum(counted.iter().map(|p| &p.net_salary));

        PayrollStatistics {
            period,
            total_payrolls: payrolls.len(),
            counts_by_status,
            total_gross: sum(counted.iter().map(|p| &p.gross_salary)),
            total_deductions: sum(counted.iter().map(|p| &p.total_deductions)),
            average_net: self.average(&total_net, counted.len()),
            total_net,
        }
    }

    /// Totals exclude cancelled payrolls; the status counts include them
    pub async fn statistics(
        &self,
        period: PayrollPeriod,
        actor: &UserProfile,
    ) -> Result<PayrollStatistics, AppError> {
        require_manager(actor)?;
        let payrolls = self.period_payrolls(period).await?;
        Ok(self.statistics_for(period, &payrolls))
    }

    pub async fn department_summary(
        &self,
        period: PayrollPeriod,
        actor: &UserProfile,
    ) -> Result<Vec<DepartmentPayrollSummary>, AppError> {
        require_manager(actor)?;

        let departments: BTreeMap<Uuid, String> = self
            .identity
            .list_users()
            .await?
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    u.department.unwrap_or_else(|| "Unassigned".to_string()),
                )
            })
            .collect();

        let mut grouped: BTreeMap<String, Vec<Payroll>> = BTreeMap::new();
        for payroll in self.period_payrolls(period).await? {
            if payroll.status == PayrollStatus::Cancelled {
                continue;
            }
            let department = departments
                .get(&payroll.user_id)
                .cloned()
                .unwrap_or_else(|| "Unassigned".to_string());
            grouped.entry(department).or_default().push(payroll);
        }

        Ok(grouped
            .into_iter()
            .map(|(department, payrolls)| {
                let total_net = sum(payrolls.iter().map(|p| &p.net_salary));
                DepartmentPayrollSummary {
                    department,
                    employee_count: payrolls.len(),
                    total_gross: sum(payrolls.iter().map(|p| &p.gross_salary)),
                    average_net: self.average(&total_net, payrolls.len()),
                    total_net,
                }
            })
            .collect())
    }

    pub async fn yearly_summary(
        &self,
        user_id: Uuid,
        year: i32,
        actor: &UserProfile,
    ) -> Result<YearlyPayrollSummary, AppError> {
        if !actor.can_access_user_resource(user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own payroll".to_string(),
            ));
        }

        let payrolls: Vec<Payroll> = self
            .payrolls
            .list(&PayrollFilter {
                user_id: Some(user_id),
                year: Some(year),
                ..PayrollFilter::default()
            })
            .await?
            .into_iter()
            .filter(|p| p.status != PayrollStatus::Cancelled)
            .collect();

        Ok(YearlyPayrollSummary {
            user_id,
            year,
            months_paid: payrolls
                .iter()
                .filter(|p| p.status == PayrollStatus::Paid)
                .count(),
            total_gross: sum(payrolls.iter().map(|p| &p.gross_salary)),
            total_deductions: sum(payrolls.iter().map(|p| &p.total_deductions)),
            total_net: sum(payrolls.iter().map(|p| &p.net_salary)),
            total_overtime_hours: sum(payrolls.iter().map(|p| &p.overtime_hours)),
            total_late_arrivals: payrolls.iter().map(|p| p.late_arrivals).sum(),
            total_absent_days: payrolls.iter().map(|p| p.absent_days).sum(),
        })
    }

    pub async fn top_earners(
        &self,
        period: PayrollPeriod,
        limit: usize,
        actor: &UserProfile,
    ) -> Result<Vec<EarnerSummary>, AppError> {
        require_manager(actor)?;

        let mut payrolls: Vec<Payroll> = self
            .period_payrolls(period)
            .await?
            .into_iter()
            .filter(|p| p.status != PayrollStatus::Cancelled)
            .collect();
        payrolls.sort_by(|a, b| b.net_salary.cmp(&a.net_salary));

        Ok(payrolls
            .into_iter()
            .take(limit)
            .map(|p| EarnerSummary {
                user_id: p.user_id,
                payroll_id: p.id,
                net_salary: p.net_salary,
                gross_salary: p.gross_salary,
                status: p.status,
            })
            .collect())
    }

    /// Compare a period with the one before it
    pub async fn compare_periods(
        &self,
        period: PayrollPeriod,
        actor: &UserProfile,
    ) -> Result<PeriodComparison, AppError> {
        require_manager(actor)?;

        let previous_period = period.previous();
        let current = self.statistics_for(period, &self.period_payrolls(period).await?);
        let previous = self.statistics_for(
            previous_period,
            &self.period_payrolls(previous_period).await?,
        );

        Ok(PeriodComparison {
            net_change_percent: percent_change(&current.total_net, &previous.total_net),
            gross_change_percent: percent_change(&current.total_gross, &previous.total_gross),
            current,
            previous,
        })
    }

    /// The `months` periods ending at `end`, oldest first
    pub async fn trends(
        &self,
        end: PayrollPeriod,
        months: u32,
        actor: &UserProfile,
    ) -> Result<Vec<MonthlyTrend>, AppError> {
        require_manager(actor)?;
        if months == 0 || months > MAX_TREND_MONTHS {
            return Err(AppError::BadRequest(format!(
                "Trend window must be between 1 and {} months",
                MAX_TREND_MONTHS
            )));
        }

        let mut periods = vec![end];
        while periods.len() < months as usize {
            let earliest = periods[periods.len() - 1].previous();
            periods.push(earliest);
        }
        periods.reverse();

        let mut trends = Vec::with_capacity(periods.len());
        for period in periods {
            let statistics = self.statistics_for(period, &self.period_payrolls(period).await?);
            trends.push(MonthlyTrend {
                period,
                payroll_count: statistics.total_payrolls,
                total_gross: statistics.total_gross,
                total_net: statistics.total_net,
            });
        }
        Ok(trends)
    }
}
