use bigdecimal::{BigDecimal, RoundingMode, Zero};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::error::AppError;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum PayrollStatus {
        Draft => "draft",
        Calculated => "calculated",
        Approved => "approved",
        Paid => "paid",
        Cancelled => "cancelled",
    }
}

impl PayrollStatus {
    pub fn can_be_edited(&self) -> bool {
        matches!(self, PayrollStatus::Draft | PayrollStatus::Calculated)
    }

    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        use PayrollStatus::*;

        matches!(
            (self, next),
            (Draft, Calculated)
                | (Calculated, Calculated)
                | (Calculated, Approved)
                | (Approved, Paid)
                | (Draft | Calculated | Approved, Cancelled)
        )
    }
}

/// Round a money or hours amount to `scale` decimal places, half-up.
pub fn round_currency(value: &BigDecimal, scale: i64) -> BigDecimal {
    value.with_scale_round(scale, RoundingMode::HalfUp)
}

/// A calendar month a payroll is computed for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct PayrollPeriod {
    pub year: i32,
    pub month: u32,
}

impl PayrollPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        let period = Self { year, month };
        period.start()?;
        Ok(period)
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn start(&self) -> Result<NaiveDate, AppError> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid payroll period {}-{}", self.year, self.month))
        })
    }

    pub fn end(&self) -> Result<NaiveDate, AppError> {
        let next = self.next();
        let next_start = next.start()?;
        next_start.pred_opt().ok_or_else(|| {
            AppError::BadRequest(format!("Invalid payroll period {}-{}", self.year, self.month))
        })
    }

    pub fn next(&self) -> Self {
        if self.month >= 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month <= 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }
}

impl std::fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Hours and penalties aggregated from a period's attendance logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub total_working_days: i32,
    pub actual_working_days: i32,
    pub regular_hours: BigDecimal,
    pub overtime_hours: BigDecimal,
    pub holiday_hours: BigDecimal,
    pub weekend_hours: BigDecimal,
    pub late_arrivals: i32,
    pub early_departures: i32,
    pub absent_days: i32,
    pub leave_days: i32,
}

impl Default for AttendanceSummary {
    fn default() -> Self {
        Self {
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
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payroll {
    pub id: Uuid,                  // UUID primary key
    pub user_id: Uuid,             // UUID for user references
    pub salary_structure_id: Uuid, // UUID for salary_structures references
    pub payroll_year: i32,
    pub payroll_month: i32,
    pub period_start: NaiveDate, // DATE
    pub period_end: NaiveDate,   // DATE

    pub total_working_days: i32,
    pub actual_working_days: i32,
    pub regular_hours: BigDecimal,  // NUMERIC(7,2)
    pub overtime_hours: BigDecimal, // NUMERIC(7,2)
    pub holiday_hours: BigDecimal,  // NUMERIC(7,2)
    pub weekend_hours: BigDecimal,  // NUMERIC(7,2)
    pub late_arrivals: i32,
    pub early_departures: i32,
    pub absent_days: i32,
    pub leave_days: i32,

    pub base_salary: BigDecimal, // NUMERIC(15,2)
    pub regular_pay: BigDecimal,
    pub overtime_pay: BigDecimal,
    pub holiday_pay: BigDecimal,
    pub weekend_pay: BigDecimal,
    pub transport_allowance: BigDecimal,
    pub meal_allowance: BigDecimal,
    pub phone_allowance: BigDecimal,
    pub other_allowances: BigDecimal,
    pub social_insurance: BigDecimal,
    pub health_insurance: BigDecimal,
    pub unemployment_insurance: BigDecimal,
    pub personal_income_tax: BigDecimal,
    pub late_penalty: BigDecimal,
    pub absent_penalty: BigDecimal,
    pub other_deductions: BigDecimal,

    pub gross_salary: BigDecimal,
    pub total_deductions: BigDecimal,
    pub net_salary: BigDecimal,

    pub status: PayrollStatus,
    pub notes: Option<String>,
    pub calculated_at: Option<DateTime<Utc>>,
    pub calculated_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_by: Option<Uuid>,
    pub created_at: DateTime<Utc>, // TIMESTAMPTZ
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl Payroll {
    pub fn period(&self) -> PayrollPeriod {
        PayrollPeriod {
            year: self.payroll_year,
            month: self.payroll_month as u32,
        }
    }

    pub fn can_be_edited(&self) -> bool {
        self.status.can_be_edited()
    }

    pub fn total_earnings(&self) -> BigDecimal {
        &self.regular_pay + &self.overtime_pay + &self.holiday_pay + &self.weekend_pay
    }

    pub fn total_allowances(&self) -> BigDecimal {
        &self.transport_allowance
            + &self.meal_allowance
            + &self.phone_allowance
            + &self.other_allowances
    }

    pub fn total_insurance(&self) -> BigDecimal {
        &self.social_insurance + &self.health_insurance + &self.unemployment_insurance
    }

    /// Recompute gross, total deductions and net from the stored components
    pub fn recalculate_totals(&mut self) {
        self.gross_salary = self.total_earnings() + self.total_allowances();
        self.total_deductions = self.total_insurance()
            + &self.personal_income_tax
            + &self.late_penalty
            + &self.absent_penalty
            + &self.other_deductions;
        self.net_salary = &self.gross_salary - &self.total_deductions;
    }

    pub fn apply_attendance(&mut self, summary: &AttendanceSummary) {
        self.total_working_days = summary.total_working_days;
        self.actual_working_days = summary.actual_working_days;
        self.regular_hours = summary.regular_hours.clone();
        self.overtime_hours = summary.overtime_hours.clone();
        self.holiday_hours = summary.holiday_hours.clone();
        self.weekend_hours = summary.weekend_hours.clone();
        self.late_arrivals = summary.late_arrivals;
        self.early_departures = summary.early_departures;
        self.absent_days = summary.absent_days;
        self.leave_days = summary.leave_days;
    }

    pub fn transition_to(&mut self, next: PayrollStatus) -> Result<PayrollStatus, AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Payroll {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let previous = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollFilter {
    pub user_id: Option<Uuid>,
    pub year: Option<i32>,
    pub month: Option<i32>,
    pub status: Option<PayrollStatus>,
}

impl PayrollFilter {
    pub fn for_period(period: PayrollPeriod) -> Self {
        Self {
            year: Some(period.year),
            month: Some(period.month as i32),
            ..Self::default()
        }
    }

    pub fn matches(&self, payroll: &Payroll) -> bool {
        self.user_id.is_none_or(|id| payroll.user_id == id)
            && self.year.is_none_or(|y| payroll.payroll_year == y)
            && self.month.is_none_or(|m| payroll.payroll_month == m)
            && self.status.is_none_or(|s| payroll.status == s)
    }
}

/// Outcome of persisting a calculated payroll for a period.
#[derive(Debug, Clone)]
pub enum PayrollWrite {
    /// The payroll was inserted or replaced a Draft
    Written(Payroll),
    /// A non-Draft payroll already held the period and was left untouched
    Existing(Payroll),
}
