use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::date_ranges_overlap;
use super::macros::string_enum;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum SalaryType {
        Monthly => "monthly",
        Hourly => "hourly",
        Daily => "daily",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStructure {
    pub id: Uuid,      // UUID primary key
    pub user_id: Uuid, // UUID for user references
    pub salary_type: SalaryType,
    pub base_salary: BigDecimal,          // NUMERIC(15,2)
    pub hourly_rate: Option<BigDecimal>,  // NUMERIC(10,2)
    pub overtime_rate: Option<BigDecimal>, // NUMERIC(10,2)
    pub holiday_rate: Option<BigDecimal>, // NUMERIC(10,2)
    pub weekend_rate: Option<BigDecimal>, // NUMERIC(10,2)
    pub transport_allowance: BigDecimal,
    pub meal_allowance: BigDecimal,
    pub phone_allowance: BigDecimal,
    pub other_allowances: BigDecimal,
    pub social_insurance_rate: BigDecimal,       // NUMERIC(5,4)
    pub health_insurance_rate: BigDecimal,       // NUMERIC(5,4)
    pub unemployment_insurance_rate: BigDecimal, // NUMERIC(5,4)
    pub personal_income_tax: BigDecimal,         // fixed amount per period
    pub other_deductions: BigDecimal,
    pub effective_date: NaiveDate,   // DATE
    pub end_date: Option<NaiveDate>, // DATE
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>, // TIMESTAMPTZ
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl SalaryStructure {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_date <= date
            && self.end_date.is_none_or(|end| date <= end)
    }

    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.covers(today)
    }

    pub fn overlaps_with(&self, start: NaiveDate, end: Option<NaiveDate>) -> bool {
        date_ranges_overlap(self.effective_date, self.end_date, start, end)
    }

    pub fn total_allowances(&self) -> BigDecimal {
        &self.transport_allowance
            + &self.meal_allowance
            + &self.phone_allowance
            + &self.other_allowances
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStructureInput {
    pub user_id: Uuid,
    pub salary_type: SalaryType,
    pub base_salary: BigDecimal,
    pub hourly_rate: Option<BigDecimal>,
    pub overtime_rate: Option<BigDecimal>,
    pub holiday_rate: Option<BigDecimal>,
    pub weekend_rate: Option<BigDecimal>,
    #[serde(default)]
    pub transport_allowance: BigDecimal,
    #[serde(default)]
    pub meal_allowance: BigDecimal,
    #[serde(default)]
    pub phone_allowance: BigDecimal,
    #[serde(default)]
    pub other_allowances: BigDecimal,
    pub social_insurance_rate: Option<BigDecimal>,
    pub health_insurance_rate: Option<BigDecimal>,
    pub unemployment_insurance_rate: Option<BigDecimal>,
    #[serde(default)]
    pub personal_income_tax: BigDecimal,
    #[serde(default)]
    pub other_deductions: BigDecimal,
    pub effective_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
}

impl SalaryStructureInput {
    pub fn overlaps_with(&self, other: &SalaryStructure) -> bool {
        other.is_active && other.overlaps_with(self.effective_date, self.end_date)
    }
}
