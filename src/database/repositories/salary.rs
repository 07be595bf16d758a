use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::SalaryStructureRepository;
use crate::database::{
    models::{SalaryStructure, SalaryStructureInput},
    transaction::DatabaseTransaction,
    utils::sql,
};

const STRUCTURE_COLUMNS: &str = r#"
    id,
    user_id,
    salary_type,
    base_salary,
    hourly_rate,
    overtime_rate,
    holiday_rate,
    weekend_rate,
    transport_allowance,
    meal_allowance,
    phone_allowance,
    other_allowances,
    social_insurance_rate,
    health_insurance_rate,
    unemployment_insurance_rate,
    personal_income_tax,
    other_deductions,
    effective_date,
    end_date,
    is_active,
    notes,
    created_by,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgSalaryStructureRepository {
    pool: PgPool,
}

impl PgSalaryStructureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SalaryStructureRepository for PgSalaryStructureRepository {
    async fn create_if_no_overlap(
        &self,
        input: SalaryStructureInput,
    ) -> Result<Option<SalaryStructure>> {
        let structure = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                DatabaseTransaction::lock_key(tx, &format!("salary_structure:{}", input.user_id))
                    .await?;

                let overlapping: i64 = sqlx::query_scalar(&sql(r#"
                    SELECT COUNT(*)
                    FROM salary_structures
                    WHERE
                        user_id = ?
                        AND is_active
                        AND effective_date <= COALESCE(?, DATE '9999-12-31')
                        AND COALESCE(end_date, DATE '9999-12-31') >= ?
                "#))
                .bind(input.user_id)
                .bind(input.end_date)
                .bind(input.effective_date)
                .fetch_one(&mut **tx)
                .await?;

                if overlapping > 0 {
                    return Ok(None);
                }

                let now = Utc::now();
                let structure = sqlx::query_as::<_, SalaryStructure>(&sql(&format!(
                    r#"
                    INSERT INTO
                        salary_structures (
                            user_id,
                            salary_type,
                            base_salary,
                            hourly_rate,
                            overtime_rate,
                            holiday_rate,
                            weekend_rate,
                            transport_allowance,
                            meal_allowance,
                            phone_allowance,
                            other_allowances,
                            social_insurance_rate,
                            health_insurance_rate,
                            unemployment_insurance_rate,
                            personal_income_tax,
                            other_deductions,
                            effective_date,
                            end_date,
                            is_active,
                            notes,
                            created_by,
                            created_at,
                            updated_at
                        )
                    VALUES
                        (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, 0), COALESCE(?, 0), COALESCE(?, 0), ?, ?, ?, ?, TRUE, ?, ?, ?, ?)
                    RETURNING {STRUCTURE_COLUMNS}
                    "#
                )))
                .bind(input.user_id)
                .bind(input.salary_type)
                .bind(input.base_salary)
                .bind(input.hourly_rate)
                .bind(input.overtime_rate)
                .bind(input.holiday_rate)
                .bind(input.weekend_rate)
                .bind(input.transport_allowance)
                .bind(input.meal_allowance)
                .bind(input.phone_allowance)
                .bind(input.other_allowances)
                .bind(input.social_insurance_rate)
                .bind(input.health_insurance_rate)
                .bind(input.unemployment_insurance_rate)
                .bind(input.personal_income_tax)
                .bind(input.other_deductions)
                .bind(input.effective_date)
                .bind(input.end_date)
                .bind(input.notes)
                .bind(input.created_by)
                .bind(now)
                .bind(now)
                .fetch_one(&mut **tx)
                .await?;

                Ok(Some(structure))
            })
        })
        .await?;

        Ok(structure)
    }

    /// Get a salary structure by ID
    async fn find(&self, id: Uuid) -> Result<Option<SalaryStructure>> {
        let structure = sqlx::query_as::<_, SalaryStructure>(&sql(&format!(
            "SELECT {STRUCTURE_COLUMNS} FROM salary_structures WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(structure)
    }

    /// Get the structure in force for a user on a date
    async fn active_for(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<SalaryStructure>> {
        let structure = sqlx::query_as::<_, SalaryStructure>(&sql(&format!(
            r#"
            SELECT {STRUCTURE_COLUMNS}
            FROM salary_structures
            WHERE
                user_id = ?
                AND is_active
                AND effective_date <= ?
                AND (end_date IS NULL OR end_date >= ?)
            ORDER BY effective_date DESC
            LIMIT 1
            "#
        )))
        .bind(user_id)
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(structure)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SalaryStructure>> {
        let structures = sqlx::query_as::<_, SalaryStructure>(&sql(&format!(
            r#"
            SELECT {STRUCTURE_COLUMNS}
            FROM salary_structures
            WHERE user_id = ?
            ORDER BY effective_date DESC
            "#
        )))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(structures)
    }

    async fn deactivate(&self, id: Uuid) -> Result<Option<SalaryStructure>> {
        let structure = sqlx::query_as::<_, SalaryStructure>(&sql(&format!(
            r#"
            UPDATE salary_structures
            SET is_active = FALSE, updated_at = ?
            WHERE id = ?
            RETURNING {STRUCTURE_COLUMNS}
            "#
        )))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(structure)
    }
}
