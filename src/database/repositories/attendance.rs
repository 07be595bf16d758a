use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AttendanceRepository;
use crate::database::{
    models::{AttendanceLog, AttendanceLogInput},
    utils::sql,
};

const LOG_COLUMNS: &str = r#"
    id,
    user_id,
    log_date,
    check_in,
    check_out,
    notes,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn insert_if_absent(&self, input: AttendanceLogInput) -> Result<Option<AttendanceLog>> {
        let now = Utc::now();

        let log = sqlx::query_as::<_, AttendanceLog>(&sql(&format!(
            r#"
            INSERT INTO
                attendance_logs (user_id, log_date, check_in, check_out, notes, created_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, log_date) DO NOTHING
            RETURNING {LOG_COLUMNS}
            "#
        )))
        .bind(input.user_id)
        .bind(input.log_date)
        .bind(input.check_in)
        .bind(input.check_out)
        .bind(input.notes)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn set_check_out(
        &self,
        id: Uuid,
        check_out: NaiveDateTime,
    ) -> Result<Option<AttendanceLog>> {
        let log = sqlx::query_as::<_, AttendanceLog>(&sql(&format!(
            r#"
            UPDATE attendance_logs
            SET check_out = ?, updated_at = ?
            WHERE id = ? AND check_out IS NULL
            RETURNING {LOG_COLUMNS}
            "#
        )))
        .bind(check_out)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn find(&self, id: Uuid) -> Result<Option<AttendanceLog>> {
        let log = sqlx::query_as::<_, AttendanceLog>(&sql(&format!(
            "SELECT {LOG_COLUMNS} FROM attendance_logs WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn find_for_user_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceLog>> {
        let log = sqlx::query_as::<_, AttendanceLog>(&sql(&format!(
            "SELECT {LOG_COLUMNS} FROM attendance_logs WHERE user_id = ? AND log_date = ?"
        )))
        .bind(user_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(log)
    }

    async fn list_for_user_between(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceLog>> {
        let logs = sqlx::query_as::<_, AttendanceLog>(&sql(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM attendance_logs
            WHERE user_id = ? AND log_date BETWEEN ? AND ?
            ORDER BY log_date
            "#
        )))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
