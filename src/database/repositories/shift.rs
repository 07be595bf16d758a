use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::ShiftRepository;
use crate::database::{
    models::{ScheduledShift, ShiftAssignment, ShiftAssignmentInput, WorkShift, WorkShiftInput},
    transaction::DatabaseTransaction,
    utils::sql,
};

const SHIFT_COLUMNS: &str = r#"
    id,
    name,
    start_time,
    end_time,
    break_minutes,
    description,
    is_active,
    created_at,
    updated_at
"#;

const ASSIGNMENT_COLUMNS: &str = r#"
    id,
    user_id,
    shift_id,
    start_date,
    end_date,
    is_active,
    created_by,
    created_at,
    updated_at
"#;

const SCHEDULED_SHIFT_SELECT: &str = r#"
    SELECT
        sa.id AS assignment_id,
        sa.user_id,
        ws.id AS shift_id,
        ws.name AS shift_name,
        ws.start_time,
        ws.end_time,
        ws.break_minutes
    FROM
        shift_assignments sa
        JOIN work_shifts ws ON ws.id = sa.shift_id
    WHERE
        sa.is_active
        AND ws.is_active
        AND sa.start_date <= ?
        AND (sa.end_date IS NULL OR sa.end_date >= ?)
"#;

#[derive(Clone)]
pub struct PgShiftRepository {
    pool: PgPool,
}

impl PgShiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShiftRepository for PgShiftRepository {
    /// Create a new work shift
    async fn create_shift(&self, input: WorkShiftInput) -> Result<WorkShift> {
        let now = Utc::now();

        let shift = sqlx::query_as::<_, WorkShift>(&sql(&format!(
            r#"
            INSERT INTO
                work_shifts (name, start_time, end_time, break_minutes, description, is_active, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?, TRUE, ?, ?)
            RETURNING {SHIFT_COLUMNS}
            "#
        )))
        .bind(input.name)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.break_minutes.unwrap_or(0))
        .bind(input.description)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Get a work shift by ID
    async fn find_shift(&self, id: Uuid) -> Result<Option<WorkShift>> {
        let shift = sqlx::query_as::<_, WorkShift>(&sql(&format!(
            "SELECT {SHIFT_COLUMNS} FROM work_shifts WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    async fn set_shift_active(&self, id: Uuid, is_active: bool) -> Result<Option<WorkShift>> {
        let shift = sqlx::query_as::<_, WorkShift>(&sql(&format!(
            r#"
            UPDATE work_shifts
            SET is_active = ?, updated_at = ?
            WHERE id = ?
            RETURNING {SHIFT_COLUMNS}
            "#
        )))
        .bind(is_active)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    async fn create_assignment_if_no_overlap(
        &self,
        input: ShiftAssignmentInput,
    ) -> Result<Option<ShiftAssignment>> {
        let assignment = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                DatabaseTransaction::lock_key(tx, &format!("shift_assignment:{}", input.user_id))
                    .await?;

                let overlapping: i64 = sqlx::query_scalar(&sql(r#"
                    SELECT COUNT(*)
                    FROM shift_assignments
                    WHERE
                        user_id = ?
                        AND is_active
                        AND start_date <= COALESCE(?, DATE '9999-12-31')
                        AND COALESCE(end_date, DATE '9999-12-31') >= ?
                "#))
                .bind(input.user_id)
                .bind(input.end_date)
                .bind(input.start_date)
                .fetch_one(&mut **tx)
                .await?;

                if overlapping > 0 {
                    return Ok(None);
                }

                let now = Utc::now();
                let assignment = sqlx::query_as::<_, ShiftAssignment>(&sql(&format!(
                    r#"
                    INSERT INTO
                        shift_assignments (user_id, shift_id, start_date, end_date, is_active, created_by, created_at, updated_at)
                    VALUES
                        (?, ?, ?, ?, TRUE, ?, ?, ?)
                    RETURNING {ASSIGNMENT_COLUMNS}
                    "#
                )))
                .bind(input.user_id)
                .bind(input.shift_id)
                .bind(input.start_date)
                .bind(input.end_date)
                .bind(input.created_by)
                .bind(now)
                .bind(now)
                .fetch_one(&mut **tx)
                .await?;

                Ok(Some(assignment))
            })
        })
        .await?;

        Ok(assignment)
    }

    async fn find_assignment(&self, id: Uuid) -> Result<Option<ShiftAssignment>> {
        let assignment = sqlx::query_as::<_, ShiftAssignment>(&sql(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM shift_assignments WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    async fn deactivate_assignment(&self, id: Uuid) -> Result<Option<ShiftAssignment>> {
        let assignment = sqlx::query_as::<_, ShiftAssignment>(&sql(&format!(
            r#"
            UPDATE shift_assignments
            SET is_active = FALSE, updated_at = ?
            WHERE id = ?
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        )))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(assignment)
    }

    /// Get all assignments of a user, newest first
    async fn list_assignments_for_user(&self, user_id: Uuid) -> Result<Vec<ShiftAssignment>> {
        let assignments = sqlx::query_as::<_, ShiftAssignment>(&sql(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM shift_assignments
            WHERE user_id = ?
            ORDER BY start_date DESC
            "#
        )))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    async fn scheduled_shifts_on(&self, date: NaiveDate) -> Result<Vec<ScheduledShift>> {
        let shifts = sqlx::query_as::<_, ScheduledShift>(&sql(&format!(
            "{SCHEDULED_SHIFT_SELECT} ORDER BY sa.user_id"
        )))
        .bind(date)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    async fn scheduled_shift_for_user_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<ScheduledShift>> {
        let shift = sqlx::query_as::<_, ScheduledShift>(&sql(&format!(
            "{SCHEDULED_SHIFT_SELECT} AND sa.user_id = ? ORDER BY sa.start_date DESC LIMIT 1"
        )))
        .bind(date)
        .bind(date)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }
}
