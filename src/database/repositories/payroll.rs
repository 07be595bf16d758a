use anyhow::{Result, anyhow};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, postgres::PgArguments, query::QueryAs};
use uuid::Uuid;

use super::PayrollRepository;
use crate::database::{
    models::{Payroll, PayrollFilter, PayrollPeriod, PayrollStatus, PayrollWrite},
    utils::sql,
};

/// Columns fixed at creation: identity and period
const KEY_COLUMNS: [&str; 5] = ["id", "user_id", "payroll_year", "payroll_month", "created_at"];

/// Columns rewritten by calculation and status changes, in bind order
const MUTABLE_COLUMNS: [&str; 41] = [
    "salary_structure_id",
    "period_start",
    "period_end",
    "total_working_days",
    "actual_working_days",
    "regular_hours",
    "overtime_hours",
    "holiday_hours",
    "weekend_hours",
    "late_arrivals",
    "early_departures",
    "absent_days",
    "leave_days",
    "base_salary",
    "regular_pay",
    "overtime_pay",
    "holiday_pay",
    "weekend_pay",
    "transport_allowance",
    "meal_allowance",
    "phone_allowance",
    "other_allowances",
    "social_insurance",
    "health_insurance",
    "unemployment_insurance",
    "personal_income_tax",
    "late_penalty",
    "absent_penalty",
    "other_deductions",
    "gross_salary",
    "total_deductions",
    "net_salary",
    "status",
    "notes",
    "calculated_at",
    "calculated_by",
    "approved_at",
    "approved_by",
    "paid_at",
    "paid_by",
    "updated_at",
];

type PayrollQuery<'q> = QueryAs<'q, Postgres, Payroll, PgArguments>;

fn all_columns() -> String {
    KEY_COLUMNS
        .iter()
        .chain(MUTABLE_COLUMNS.iter())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_mutable<'q>(query: PayrollQuery<'q>, p: &'q Payroll) -> PayrollQuery<'q> {
    query
        .bind(p.salary_structure_id)
        .bind(p.period_start)
        .bind(p.period_end)
        .bind(p.total_working_days)
        .bind(p.actual_working_days)
        .bind(&p.regular_hours)
        .bind(&p.overtime_hours)
        .bind(&p.holiday_hours)
        .bind(&p.weekend_hours)
        .bind(p.late_arrivals)
        .bind(p.early_departures)
        .bind(p.absent_days)
        .bind(p.leave_days)
        .bind(&p.base_salary)
        .bind(&p.regular_pay)
        .bind(&p.overtime_pay)
        .bind(&p.holiday_pay)
        .bind(&p.weekend_pay)
        .bind(&p.transport_allowance)
        .bind(&p.meal_allowance)
        .bind(&p.phone_allowance)
        .bind(&p.other_allowances)
        .bind(&p.social_insurance)
        .bind(&p.health_insurance)
        .bind(&p.unemployment_insurance)
        .bind(&p.personal_income_tax)
        .bind(&p.late_penalty)
        .bind(&p.absent_penalty)
        .bind(&p.other_deductions)
        .bind(&p.gross_salary)
        .bind(&p.total_deductions)
        .bind(&p.net_salary)
        .bind(p.status)
        .bind(&p.notes)
        .bind(p.calculated_at)
        .bind(p.calculated_by)
        .bind(p.approved_at)
        .bind(p.approved_by)
        .bind(p.paid_at)
        .bind(p.paid_by)
        .bind(p.updated_at)
}

#[derive(Clone)]
pub struct PgPayrollRepository {
    pool: PgPool,
}

impl PgPayrollRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayrollRepository for PgPayrollRepository {
    /// Get a payroll by ID
    async fn find(&self, id: Uuid) -> Result<Option<Payroll>> {
        let payroll = sqlx::query_as::<_, Payroll>(&sql(&format!(
            "SELECT {} FROM payrolls WHERE id = ?",
            all_columns()
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payroll)
    }

    async fn find_for_period(
        &self,
        user_id: Uuid,
        period: PayrollPeriod,
    ) -> Result<Option<Payroll>> {
        let payroll = sqlx::query_as::<_, Payroll>(&sql(&format!(
            "SELECT {} FROM payrolls WHERE user_id = ? AND payroll_year = ? AND payroll_month = ?",
            all_columns()
        )))
        .bind(user_id)
        .bind(period.year)
        .bind(period.month as i32)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payroll)
    }

    async fn save_calculated(&self, payroll: &Payroll) -> Result<PayrollWrite> {
        let placeholders = vec!["?"; KEY_COLUMNS.len() + MUTABLE_COLUMNS.len()].join(", ");
        let updates = MUTABLE_COLUMNS
            .iter()
            .map(|column| format!("{column} = EXCLUDED.{column}"))
            .collect::<Vec<_>>()
            .join(", ");

        let query = sql(&format!(
            r#"
            INSERT INTO payrolls ({columns})
            VALUES ({placeholders})
            ON CONFLICT (user_id, payroll_year, payroll_month) DO UPDATE
            SET {updates}
            WHERE payrolls.status = 'draft'
            RETURNING {columns}
            "#,
            columns = all_columns(),
        ));

        let written = bind_mutable(
            sqlx::query_as::<_, Payroll>(&query)
                .bind(payroll.id)
                .bind(payroll.user_id)
                .bind(payroll.payroll_year)
                .bind(payroll.payroll_month)
                .bind(payroll.created_at),
            payroll,
        )
        .fetch_optional(&self.pool)
        .await?;

        if let Some(written) = written {
            return Ok(PayrollWrite::Written(written));
        }

        let existing = self
            .find_for_period(payroll.user_id, payroll.period())
            .await?
            .ok_or_else(|| anyhow!("Payroll for {} vanished during upsert", payroll.period()))?;

        Ok(PayrollWrite::Existing(existing))
    }

    async fn save_transition(
        &self,
        payroll: &Payroll,
        expected: PayrollStatus,
    ) -> Result<Option<Payroll>> {
        let assignments = MUTABLE_COLUMNS
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        let query = sql(&format!(
            "UPDATE payrolls SET {assignments} WHERE id = ? AND status = ? RETURNING {}",
            all_columns()
        ));

        let saved = bind_mutable(sqlx::query_as::<_, Payroll>(&query), payroll)
            .bind(payroll.id)
            .bind(expected)
            .fetch_optional(&self.pool)
            .await?;

        Ok(saved)
    }

    async fn list(&self, filter: &PayrollFilter) -> Result<Vec<Payroll>> {
        let payrolls = sqlx::query_as::<_, Payroll>(&sql(&format!(
            r#"
            SELECT {}
            FROM payrolls
            WHERE
                user_id = COALESCE(?, user_id)
                AND payroll_year = COALESCE(?, payroll_year)
                AND payroll_month = COALESCE(?, payroll_month)
                AND status = COALESCE(?, status)
            ORDER BY payroll_year DESC, payroll_month DESC, net_salary DESC
            "#,
            all_columns()
        )))
        .bind(filter.user_id)
        .bind(filter.year)
        .bind(filter.month)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(payrolls)
    }
}
