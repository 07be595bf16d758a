use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::EvidenceRepository;
use crate::database::{
    models::{Evidence, NewEvidence},
    transaction::DatabaseTransaction,
    utils::sql,
};

pub(super) const EVIDENCE_COLUMNS: &str = r#"
    id,
    explanation_id,
    original_filename,
    stored_filename,
    storage_path,
    file_url,
    file_size,
    content_type,
    kind,
    description,
    is_verified,
    verified_by,
    verified_at,
    uploaded_at
"#;

#[derive(Clone)]
pub struct PgEvidenceRepository {
    pool: PgPool,
}

impl PgEvidenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvidenceRepository for PgEvidenceRepository {
    async fn create_within_cap(
        &self,
        input: NewEvidence,
        max_total_bytes: i64,
    ) -> Result<Option<Evidence>> {
        let evidence = DatabaseTransaction::run(&self.pool, move |tx| {
            Box::pin(async move {
                DatabaseTransaction::lock_key(tx, &format!("evidence:{}", input.explanation_id))
                    .await?;

                let current_total: i64 = sqlx::query_scalar(&sql(
                    "SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM evidence WHERE explanation_id = ?",
                ))
                .bind(input.explanation_id)
                .fetch_one(&mut **tx)
                .await?;

                if current_total + input.file_size > max_total_bytes {
                    return Ok(None);
                }

                let evidence = sqlx::query_as::<_, Evidence>(&sql(&format!(
                    r#"
                    INSERT INTO
                        evidence (
                            explanation_id,
                            original_filename,
                            stored_filename,
                            storage_path,
                            file_url,
                            file_size,
                            content_type,
                            kind,
                            description,
                            is_verified,
                            uploaded_at
                        )
                    VALUES
                        (?, ?, ?, ?, ?, ?, ?, ?, ?, FALSE, ?)
                    RETURNING {EVIDENCE_COLUMNS}
                    "#
                )))
                .bind(input.explanation_id)
                .bind(input.original_filename)
                .bind(input.stored_filename)
                .bind(input.storage_path)
                .bind(input.file_url)
                .bind(input.file_size)
                .bind(input.content_type)
                .bind(input.kind)
                .bind(input.description)
                .bind(Utc::now())
                .fetch_one(&mut **tx)
                .await?;

                Ok(Some(evidence))
            })
        })
        .await?;

        Ok(evidence)
    }

    /// Get an evidence row by ID
    async fn find(&self, id: Uuid) -> Result<Option<Evidence>> {
        let evidence = sqlx::query_as::<_, Evidence>(&sql(&format!(
            "SELECT {EVIDENCE_COLUMNS} FROM evidence WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(evidence)
    }

    async fn list_for_explanation(&self, explanation_id: Uuid) -> Result<Vec<Evidence>> {
        let evidence = sqlx::query_as::<_, Evidence>(&sql(&format!(
            r#"
            SELECT {EVIDENCE_COLUMNS}
            FROM evidence
            WHERE explanation_id = ?
            ORDER BY uploaded_at
            "#
        )))
        .bind(explanation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(evidence)
    }

    async fn total_size_for_explanation(&self, explanation_id: Uuid) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(&sql(
            "SELECT COALESCE(SUM(file_size), 0)::BIGINT FROM evidence WHERE explanation_id = ?",
        ))
        .bind(explanation_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn mark_verified(
        &self,
        id: Uuid,
        verifier_id: Uuid,
        verified_at: DateTime<Utc>,
    ) -> Result<Option<Evidence>> {
        let evidence = sqlx::query_as::<_, Evidence>(&sql(&format!(
            r#"
            UPDATE evidence
            SET is_verified = TRUE, verified_by = ?, verified_at = ?
            WHERE id = ?
            RETURNING {EVIDENCE_COLUMNS}
            "#
        )))
        .bind(verifier_id)
        .bind(verified_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(evidence)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(&sql("DELETE FROM evidence WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_explanation(&self, explanation_id: Uuid) -> Result<Vec<Evidence>> {
        let removed = sqlx::query_as::<_, Evidence>(&sql(&format!(
            "DELETE FROM evidence WHERE explanation_id = ? RETURNING {EVIDENCE_COLUMNS}"
        )))
        .bind(explanation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(removed)
    }

    async fn list_unverified(&self) -> Result<Vec<Evidence>> {
        let evidence = sqlx::query_as::<_, Evidence>(&sql(&format!(
            r#"
            SELECT {EVIDENCE_COLUMNS}
            FROM evidence
            WHERE NOT is_verified
            ORDER BY uploaded_at
            "#
        )))
        .fetch_all(&self.pool)
        .await?;

        Ok(evidence)
    }
}
