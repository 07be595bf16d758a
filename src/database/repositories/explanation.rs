use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    ExplanationRepository, ViolationUpdate, evidence::EVIDENCE_COLUMNS, violation::save_transition_tx,
};
use crate::database::{
    models::{
        Evidence, Explanation, ExplanationFilter, ExplanationStatus, NewExplanation,
        RemovedExplanation, Violation, ViolationStatus,
    },
    utils::sql,
};

const EXPLANATION_COLUMNS: &str = r#"
    id,
    violation_id,
    submitted_by,
    explanation_text,
    status,
    submitted_at,
    reviewed_by,
    reviewed_at,
    review_notes,
    is_valid,
    updated_at
"#;

#[derive(Clone)]
pub struct PgExplanationRepository {
    pool: PgPool,
}

impl PgExplanationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExplanationRepository for PgExplanationRepository {
    /// Get an explanation by ID
    async fn find(&self, id: Uuid) -> Result<Option<Explanation>> {
        let explanation = sqlx::query_as::<_, Explanation>(&sql(&format!(
            "SELECT {EXPLANATION_COLUMNS} FROM explanations WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(explanation)
    }

    async fn list(&self, filter: &ExplanationFilter) -> Result<Vec<Explanation>> {
        let explanations = sqlx::query_as::<_, Explanation>(&sql(&format!(
            r#"
            SELECT {EXPLANATION_COLUMNS}
            FROM explanations
            WHERE
                violation_id = COALESCE(?, violation_id)
                AND submitted_by = COALESCE(?, submitted_by)
                AND status = COALESCE(?, status)
            ORDER BY submitted_at DESC
            "#
        )))
        .bind(filter.violation_id)
        .bind(filter.submitted_by)
        .bind(filter.status)
        .fetch_all(&self.pool)
        .await?;

        Ok(explanations)
    }

    async fn create_with_violation(
        &self,
        input: NewExplanation,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Option<Explanation>> {
        let mut tx = self.pool.begin().await?;

        if save_transition_tx(&mut tx, violation, expected).await?.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let now = Utc::now();
        let explanation = sqlx::query_as::<_, Explanation>(&sql(&format!(
            r#"
            INSERT INTO
                explanations (violation_id, submitted_by, explanation_text, status, submitted_at, updated_at)
            VALUES
                (?, ?, ?, ?, ?, ?)
            RETURNING {EXPLANATION_COLUMNS}
            "#
        )))
        .bind(input.violation_id)
        .bind(input.submitted_by)
        .bind(input.explanation_text)
        .bind(ExplanationStatus::Submitted)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(explanation))
    }

    async fn save_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> Result<Option<Explanation>> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, Explanation>(&sql(&format!(
            r#"
            UPDATE explanations
            SET
                explanation_text = ?,
                status = ?,
                submitted_at = ?,
                reviewed_by = ?,
                reviewed_at = ?,
                review_notes = ?,
                is_valid = ?,
                updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING {EXPLANATION_COLUMNS}
            "#
        )))
        .bind(&explanation.explanation_text)
        .bind(explanation.status)
        .bind(explanation.submitted_at)
        .bind(explanation.reviewed_by)
        .bind(explanation.reviewed_at)
        .bind(&explanation.review_notes)
        .bind(explanation.is_valid)
        .bind(Utc::now())
        .bind(explanation.id)
        .bind(expected)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(saved) = saved else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some((violation, violation_expected)) = violation {
            if save_transition_tx(&mut tx, violation, violation_expected)
                .await?
                .is_none()
            {
                tx.rollback().await?;
                return Ok(None);
            }
        }

        tx.commit().await?;

        Ok(Some(saved))
    }

    async fn delete_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> Result<Option<RemovedExplanation>> {
        let mut tx = self.pool.begin().await?;

        let evidence = sqlx::query_as::<_, Evidence>(&sql(&format!(
            "DELETE FROM evidence WHERE explanation_id = ? RETURNING {EVIDENCE_COLUMNS}"
        )))
        .bind(explanation.id)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query(&sql("DELETE FROM explanations WHERE id = ? AND status = ?"))
            .bind(explanation.id)
            .bind(expected)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let remaining: i64 =
            sqlx::query_scalar(&sql("SELECT COUNT(*) FROM explanations WHERE violation_id = ?"))
                .bind(explanation.violation_id)
                .fetch_one(&mut *tx)
                .await?;

        let mut violation_reopened = false;
        if remaining == 0 {
            if let Some((violation, violation_expected)) = violation {
                violation_reopened = save_transition_tx(&mut tx, violation, violation_expected)
                    .await?
                    .is_some();
            }
        }

        tx.commit().await?;

        Ok(Some(RemovedExplanation {
            evidence,
            violation_reopened,
        }))
    }
}
