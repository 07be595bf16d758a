use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::ViolationRepository;
use crate::database::{
    models::{NewViolation, Violation, ViolationFilter, ViolationStatus, ViolationType},
    utils::sql,
};

pub(crate) const VIOLATION_COLUMNS: &str = r#"
    id,
    user_id,
    shift_assignment_id,
    attendance_log_id,
    violation_date,
    violation_type,
    severity,
    expected_time,
    actual_time,
    deviation_minutes,
    status,
    auto_detected,
    description,
    resolved_by,
    resolved_at,
    resolution_notes,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PgViolationRepository {
    pool: PgPool,
}

impl PgViolationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Compare-and-set a violation's status and resolution fields inside a transaction
pub(crate) async fn save_transition_tx(
    tx: &mut Transaction<'_, Postgres>,
    violation: &Violation,
    expected: ViolationStatus,
) -> Result<Option<Violation>, sqlx::Error> {
    sqlx::query_as::<_, Violation>(&sql(&format!(
        r#"
        UPDATE violations
        SET
            status = ?,
            resolved_by = ?,
            resolved_at = ?,
            resolution_notes = ?,
            updated_at = ?
        WHERE id = ? AND status = ?
        RETURNING {VIOLATION_COLUMNS}
        "#
    )))
    .bind(violation.status)
    .bind(violation.resolved_by)
    .bind(violation.resolved_at)
    .bind(&violation.resolution_notes)
    .bind(Utc::now())
    .bind(violation.id)
    .bind(expected)
    .fetch_optional(&mut **tx)
    .await
}

#[async_trait]
impl ViolationRepository for PgViolationRepository {
    /// Create a violation unless one already exists for (user, date, type)
    async fn insert_if_absent(&self, input: NewViolation) -> Result<Option<Violation>> {
        let now = Utc::now();

        let violation = sqlx::query_as::<_, Violation>(&sql(&format!(
            r#"
            INSERT INTO
                violations (
                    user_id,
                    shift_assignment_id,
                    attendance_log_id,
                    violation_date,
                    violation_type,
                    severity,
                    expected_time,
                    actual_time,
                    deviation_minutes,
                    status,
                    auto_detected,
                    description,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, violation_date, violation_type) DO NOTHING
            RETURNING {VIOLATION_COLUMNS}
            "#
        )))
        .bind(input.user_id)
        .bind(input.shift_assignment_id)
        .bind(input.attendance_log_id)
        .bind(input.violation_date)
        .bind(input.violation_type)
        .bind(input.severity)
        .bind(input.expected_time)
        .bind(input.actual_time)
        .bind(input.deviation_minutes)
        .bind(ViolationStatus::PendingExplanation)
        .bind(input.auto_detected)
        .bind(input.description)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(violation)
    }

    async fn exists(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        violation_type: ViolationType,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(&sql(r#"
            SELECT EXISTS (
                SELECT 1
                FROM violations
                WHERE user_id = ? AND violation_date = ? AND violation_type = ?
            )
        "#))
        .bind(user_id)
        .bind(date)
        .bind(violation_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Get a violation by ID
    async fn find(&self, id: Uuid) -> Result<Option<Violation>> {
        let violation = sqlx::query_as::<_, Violation>(&sql(&format!(
            "SELECT {VIOLATION_COLUMNS} FROM violations WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(violation)
    }

    async fn list(&self, filter: &ViolationFilter) -> Result<Vec<Violation>> {
        let violations = sqlx::query_as::<_, Violation>(&sql(&format!(
            r#"
            SELECT {VIOLATION_COLUMNS}
            FROM violations
            WHERE
                user_id = COALESCE(?, user_id)
                AND status = COALESCE(?, status)
                AND violation_type = COALESCE(?, violation_type)
                AND severity = COALESCE(?, severity)
                AND violation_date >= COALESCE(?, violation_date)
                AND violation_date <= COALESCE(?, violation_date)
            ORDER BY violation_date DESC, created_at DESC
            "#
        )))
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(filter.violation_type)
        .bind(filter.severity)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(violations)
    }

    async fn save_transition(
        &self,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Option<Violation>> {
        let mut tx = self.pool.begin().await?;
        let saved = save_transition_tx(&mut tx, violation, expected).await?;
        tx.commit().await?;

        Ok(saved)
    }
}
