use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::storage::FileStorage;
use super::violations::require_manager;
use crate::config::EvidenceConfig;
use crate::database::models::{
    BatchResult, Evidence, EvidenceKind, EvidenceUpload, Explanation, NewEvidence, UserProfile,
};
use crate::database::repositories::{EvidenceRepository, ExplanationRepository};
use crate::error::AppError;

#[derive(Clone)]
pub struct EvidenceService {
    evidence: Arc<dyn EvidenceRepository>,
    explanations: Arc<dyn ExplanationRepository>,
    storage: Arc<dyn FileStorage>,
    config: EvidenceConfig,
}

impl EvidenceService {
    pub fn new(
        evidence: Arc<dyn EvidenceRepository>,
        explanations: Arc<dyn ExplanationRepository>,
        storage: Arc<dyn FileStorage>,
        config: EvidenceConfig,
    ) -> Self {
        Self {
            evidence,
            explanations,
            storage,
            config,
        }
    }

    /// Check one file against the per-file rules and the explanation's running total
    pub fn validate(&self, upload: &EvidenceUpload, current_total: i64) -> Result<(), AppError> {
        let file_name = upload.file_name.trim();
        if file_name.is_empty() {
            return Err(AppError::BadRequest("File name is required".to_string()));
        }
        if file_name.chars().count() > self.config.max_filename_length {
            return Err(AppError::BadRequest(format!(
                "File name must be at most {} characters",
                self.config.max_filename_length
            )));
        }
        if upload.content.is_empty() {
            return Err(AppError::BadRequest(format!("File {} is empty", file_name)));
        }
        if upload.size() > self.config.max_file_size_bytes {
            return Err(AppError::BadRequest(format!(
                "File {} is {} bytes, the limit is {} bytes",
                file_name,
                upload.size(),
                self.config.max_file_size_bytes
            )));
        }
        if !self.config.is_allowed_content_type(&upload.content_type) {
            return Err(AppError::BadRequest(format!(
                "File type {} is not allowed",
                upload.content_type
            )));
        }
        if current_total + upload.size() > self.config.max_total_size_bytes {
            return Err(AppError::BadRequest(format!(
                "Total evidence for an explanation may not exceed {} bytes",
                self.config.max_total_size_bytes
            )));
        }
        Ok(())
    }

    async fn load_explanation(&self, explanation_id: Uuid) -> Result<Explanation, AppError> {
        self.explanations
            .find(explanation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Explanation", explanation_id))
    }

    async fn load(&self, id: Uuid) -> Result<Evidence, AppError> {
        self.evidence
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Evidence", id))
    }

    pub async fn upload(
        &self,
        explanation_id: Uuid,
        upload: EvidenceUpload,
    ) -> Result<Evidence, AppError> {
        let explanation = self.load_explanation(explanation_id).await?;
        // Same window in which the submitter may still withdraw it
        if !explanation.can_be_deleted() {
            return Err(AppError::Conflict(format!(
                "Explanation {} cannot receive evidence while {}",
                explanation_id, explanation.status
            )));
        }

        let current_total = self.evidence.total_size_for_explanation(explanation_id).await?;
        self.validate(&upload, current_total)?;

        let stored_name = match upload.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let folder = format!("evidence/{}", explanation_id);
        let stored = self
            .storage
            .save(&folder, &stored_name, &upload.content, &upload.content_type)
            .await?;

        let input = NewEvidence {
            explanation_id,
            original_filename: upload.file_name.trim().to_string(),
            stored_filename: stored.stored_name.clone(),
            storage_path: stored.path.clone(),
            file_url: stored.url.clone(),
            file_size: upload.size(),
            content_type: upload.content_type.trim().to_ascii_lowercase(),
            kind: upload
                .kind
                .unwrap_or_else(|| EvidenceKind::detect(&upload.content_type)),
            description: upload.description,
        };

        let created = self
            .evidence
            .create_within_cap(input, self.config.max_total_size_bytes)
            .await;

        match created {
            Ok(Some(evidence)) => {
                log::info!(
                    "Stored evidence {} ({} bytes) for explanation {}",
                    evidence.id,
                    evidence.file_size,
                    explanation_id
                );
                Ok(evidence)
            }
            Ok(None) => {
                self.discard_stored(&stored.path).await;
                Err(AppError::BadRequest(format!(
                    "Total evidence for an explanation may not exceed {} bytes",
                    self.config.max_total_size_bytes
                )))
            }
            Err(e) => {
                self.discard_stored(&stored.path).await;
                Err(e.into())
            }
        }
    }

    async fn discard_stored(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            log::warn!("Failed to remove orphaned evidence file {}: {}", path, e);
        }
    }

    /// Attempt every file independently
    pub async fn upload_many(
        &self,
        explanation_id: Uuid,
        uploads: Vec<EvidenceUpload>,
    ) -> BatchResult<Evidence> {
        let mut result = BatchResult::default();

        for upload in uploads {
            let file_name = upload.file_name.clone();
            match self.upload(explanation_id, upload).await {
                Ok(evidence) => result.succeeded.push(evidence),
                Err(e) => {
                    log::warn!(
                        "Evidence {} for explanation {} rejected: {}",
                        file_name,
                        explanation_id,
                        e
                    );
                    result.record_failure(file_name, e);
                }
            }
        }

        result
    }

    pub async fn verify(&self, id: Uuid, verifier: &UserProfile) -> Result<Evidence, AppError> {
        require_manager(verifier)?;

        self.evidence
            .mark_verified(id, verifier.id, Utc::now())
            .await?
            .ok_or_else(|| AppError::not_found("Evidence", id))
    }

    /// The explanation's submitter or any manager/admin
    pub async fn can_access(&self, evidence: &Evidence, user: &UserProfile) -> Result<bool, AppError> {
        if user.is_manager_or_admin() {
            return Ok(true);
        }
        let explanation = self.load_explanation(evidence.explanation_id).await?;
        Ok(explanation.submitted_by == user.id)
    }

    pub async fn list_for_explanation(
        &self,
        explanation_id: Uuid,
        user: &UserProfile,
    ) -> Result<Vec<Evidence>, AppError> {
        let explanation = self.load_explanation(explanation_id).await?;
        if explanation.submitted_by != user.id && !user.is_manager_or_admin() {
            return Err(AppError::PermissionDenied(
                "You cannot view this evidence".to_string(),
            ));
        }

        Ok(self.evidence.list_for_explanation(explanation_id).await?)
    }

    pub async fn download_url(&self, id: Uuid, user: &UserProfile) -> Result<String, AppError> {
        let evidence = self.load(id).await?;
        if !self.can_access(&evidence, user).await? {
            return Err(AppError::PermissionDenied(
                "You cannot download this evidence".to_string(),
            ));
        }

        let signed = match self
            .storage
            .signed_url(&evidence.storage_path, self.config.signed_url_minutes)
            .await
        {
            Ok(signed) => signed,
            Err(e) => {
                log::warn!("Could not sign URL for evidence {}: {}", id, e);
                None
            }
        };

        Ok(signed.unwrap_or_else(|| format!("{}?token={}", evidence.file_url, Uuid::new_v4())))
    }

    pub async fn delete(&self, id: Uuid, user: &UserProfile) -> Result<(), AppError> {
        let evidence = self.load(id).await?;

        if !user.is_manager_or_admin() {
            let explanation = self.load_explanation(evidence.explanation_id).await?;
            if explanation.submitted_by != user.id || !explanation.can_be_deleted() {
                return Err(AppError::PermissionDenied(
                    "You cannot delete this evidence".to_string(),
                ));
            }
        }

        if !self.evidence.delete(id).await? {
            return Err(AppError::not_found("Evidence", id));
        }
        self.discard_stored(&evidence.storage_path).await;

        Ok(())
    }

    /// Remove every row and stored file of an explanation's evidence
    pub async fn delete_for_explanation(&self, explanation_id: Uuid) -> Result<usize, AppError> {
        let removed = self.evidence.delete_for_explanation(explanation_id).await?;
        self.discard_files(&removed).await;
        Ok(removed.len())
    }

    /// Remove the stored files of evidence rows that are already deleted
    pub(crate) async fn discard_files(&self, removed: &[Evidence]) {
        for evidence in removed {
            self.discard_stored(&evidence.storage_path).await;
        }
    }

    pub async fn total_size_for_explanation(&self, explanation_id: Uuid) -> Result<i64, AppError> {
        Ok(self.evidence.total_size_for_explanation(explanation_id).await?)
    }

    pub async fn list_unverified(&self, actor: &UserProfile) -> Result<Vec<Evidence>, AppError> {
        require_manager(actor)?;
        Ok(self.evidence.list_unverified().await?)
    }
}
