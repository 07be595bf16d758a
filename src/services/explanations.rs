use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::evidence::EvidenceService;
use super::violations::require_manager;
use crate::config::DetectionConfig;
use crate::database::models::{
    EvidenceUpload, Explanation, ExplanationFilter, ExplanationStatus, ExplanationWithEvidence,
    NewExplanation, UserProfile, Violation, ViolationStatus,
};
use crate::database::repositories::{ExplanationRepository, ViolationRepository};
use crate::error::AppError;

pub const MIN_EXPLANATION_CHARS: usize = 10;
pub const MAX_EXPLANATION_CHARS: usize = 2000;

/// Trim and length-check explanation text
pub fn validate_explanation_text(text: &str) -> Result<String, AppError> {
    let trimmed = text.trim();
    let length = trimmed.chars().count();
    if !(MIN_EXPLANATION_CHARS..=MAX_EXPLANATION_CHARS).contains(&length) {
        return Err(AppError::BadRequest(format!(
            "Explanation must be between {} and {} characters",
            MIN_EXPLANATION_CHARS, MAX_EXPLANATION_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

#[derive(Clone)]
pub struct ExplanationService {
    explanations: Arc<dyn ExplanationRepository>,
    violations: Arc<dyn ViolationRepository>,
    evidence: EvidenceService,
    config: DetectionConfig,
}

impl ExplanationService {
    pub fn new(
        explanations: Arc<dyn ExplanationRepository>,
        violations: Arc<dyn ViolationRepository>,
        evidence: EvidenceService,
        config: DetectionConfig,
    ) -> Self {
        Self {
            explanations,
            violations,
            evidence,
            config,
        }
    }

    async fn load(&self, id: Uuid) -> Result<Explanation, AppError> {
        self.explanations
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Explanation", id))
    }

    async fn load_violation(&self, id: Uuid) -> Result<Violation, AppError> {
        self.violations
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Violation", id))
    }

    fn concurrent_change(id: Uuid) -> AppError {
        AppError::Conflict(format!("Explanation {} was modified concurrently", id))
    }

    pub async fn get(&self, id: Uuid, actor: &UserProfile) -> Result<Explanation, AppError> {
        let explanation = self.load(id).await?;
        if !actor.can_access_user_resource(explanation.submitted_by) {
            return Err(AppError::PermissionDenied(
                "You can only view your own explanations".to_string(),
            ));
        }
        Ok(explanation)
    }

    pub async fn submit(
        &self,
        violation_id: Uuid,
        submitter: &UserProfile,
        text: &str,
        files: Vec<EvidenceUpload>,
    ) -> Result<ExplanationWithEvidence, AppError> {
        let mut violation = self.load_violation(violation_id).await?;

        if violation.user_id != submitter.id {
            return Err(AppError::PermissionDenied(
                "You can only explain your own violations".to_string(),
            ));
        }
        if !violation.can_be_explained() {
            return Err(AppError::Conflict(format!(
                "Violation {} cannot be explained while {}",
                violation_id, violation.status
            )));
        }
        let text = validate_explanation_text(text)?;

        let previous = violation.transition_to(ViolationStatus::ExplanationSubmitted)?;
        let explanation = self
            .explanations
            .create_with_violation(
                NewExplanation {
                    violation_id,
                    submitted_by: submitter.id,
                    explanation_text: text,
                },
                &violation,
                previous,
            )
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Violation {} was modified concurrently",
                    violation_id
                ))
            })?;

        log::info!(
            "Explanation {} submitted for violation {} by {}",
            explanation.id,
            violation_id,
            submitter.id
        );

        let uploads = self.evidence.upload_many(explanation.id, files).await;

        Ok(ExplanationWithEvidence {
            explanation,
            evidence: uploads.succeeded,
            evidence_failures: uploads.failed,
        })
    }

    /// Replace the text of a bounced explanation and put it back in the review queue
    pub async fn edit(
        &self,
        id: Uuid,
        submitter: &UserProfile,
        text: &str,
    ) -> Result<Explanation, AppError> {
        let mut explanation = self.load(id).await?;

        if explanation.submitted_by != submitter.id {
            return Err(AppError::PermissionDenied(
                "You can only edit your own explanations".to_string(),
            ));
        }
        if !explanation.can_be_edited() {
            return Err(AppError::Conflict(format!(
                "Explanation {} cannot be edited while {}",
                id, explanation.status
            )));
        }
        let text = validate_explanation_text(text)?;

        let previous = explanation.resubmit(text)?;

        let mut violation = self.load_violation(explanation.violation_id).await?;
        let violation_update = if violation.status == ViolationStatus::Rejected {
            let violation_previous =
                violation.transition_to(ViolationStatus::ExplanationSubmitted)?;
            Some((&violation, violation_previous))
        } else {
            None
        };

        self.explanations
            .save_with_violation(&explanation, previous, violation_update)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))
    }

    fn check_reviewer(explanation: &Explanation, reviewer: &UserProfile) -> Result<(), AppError> {
        require_manager(reviewer)?;
        if explanation.submitted_by == reviewer.id {
            return Err(AppError::PermissionDenied(
                "You cannot review your own explanation".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn start_review(
        &self,
        id: Uuid,
        reviewer: &UserProfile,
    ) -> Result<Explanation, AppError> {
        let mut explanation = self.load(id).await?;
        Self::check_reviewer(&explanation, reviewer)?;

        let previous = explanation.transition_to(ExplanationStatus::UnderReview)?;
        explanation.reviewed_by = Some(reviewer.id);

        let mut violation = self.load_violation(explanation.violation_id).await?;
        let violation_update = if violation.status == ViolationStatus::ExplanationSubmitted {
            let violation_previous = violation.transition_to(ViolationStatus::UnderReview)?;
            Some((&violation, violation_previous))
        } else {
            None
        };

        self.explanations
            .save_with_violation(&explanation, previous, violation_update)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))
    }

    pub async fn approve(
        &self,
        id: Uuid,
        reviewer: &UserProfile,
        notes: Option<String>,
    ) -> Result<Explanation, AppError> {
        self.decide(id, reviewer, ExplanationStatus::Approved, notes)
            .await
    }

    pub async fn reject(
        &self,
        id: Uuid,
        reviewer: &UserProfile,
        notes: Option<String>,
    ) -> Result<Explanation, AppError> {
        self.decide(id, reviewer, ExplanationStatus::Rejected, notes)
            .await
    }

    pub async fn request_more_info(
        &self,
        id: Uuid,
        reviewer: &UserProfile,
        notes: Option<String>,
    ) -> Result<Explanation, AppError> {
        self.decide(id, reviewer, ExplanationStatus::RequiresMoreInfo, notes)
            .await
    }

    async fn decide(
        &self,
        id: Uuid,
        reviewer: &UserProfile,
        decision: ExplanationStatus,
        notes: Option<String>,
    ) -> Result<Explanation, AppError> {
        let mut explanation = self.load(id).await?;
        Self::check_reviewer(&explanation, reviewer)?;

        if !explanation.is_pending_review() {
            return Err(AppError::Conflict(format!(
                "Explanation {} is not pending review",
                id
            )));
        }

        let is_valid = match decision {
            ExplanationStatus::Approved => Some(true),
            ExplanationStatus::Rejected => Some(false),
            _ => None,
        };
        let previous = explanation.record_review(decision, reviewer.id, notes.clone(), is_valid)?;

        let mut violation = self.load_violation(explanation.violation_id).await?;
        let violation_next = match decision {
            ExplanationStatus::Approved => Some(ViolationStatus::Approved),
            ExplanationStatus::Rejected => Some(ViolationStatus::Rejected),
            _ if violation.status == ViolationStatus::ExplanationSubmitted => {
                Some(ViolationStatus::UnderReview)
            }
            _ => None,
        };

        let violation_update = match violation_next {
            Some(next) => {
                let violation_previous = violation.transition_to(next)?;
                if next == ViolationStatus::Approved {
                    violation.resolved_by = Some(reviewer.id);
                    violation.resolved_at = Some(Utc::now());
                    violation.resolution_notes = notes;
                }
                Some((&violation, violation_previous))
            }
            None => None,
        };

        let saved = self
            .explanations
            .save_with_violation(&explanation, previous, violation_update)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))?;

        log::info!(
            "Explanation {} marked {} by {}",
            id,
            saved.status,
            reviewer.id
        );
        Ok(saved)
    }

    /// Withdraw an explanation. Returns whether its violation reopened for explanation.
    pub async fn delete(&self, id: Uuid, submitter: &UserProfile) -> Result<bool, AppError> {
        let explanation = self.load(id).await?;

        if explanation.submitted_by != submitter.id {
            return Err(AppError::PermissionDenied(
                "You can only delete your own explanations".to_string(),
            ));
        }
        if !explanation.can_be_deleted() {
            return Err(AppError::Conflict(format!(
                "Explanation {} cannot be deleted while {}",
                id, explanation.status
            )));
        }

        let mut violation = self.load_violation(explanation.violation_id).await?;
        let violation_update = if violation
            .status
            .can_transition_to(ViolationStatus::PendingExplanation)
        {
            let violation_previous = violation.transition_to(ViolationStatus::PendingExplanation)?;
            Some((&violation, violation_previous))
        } else {
            None
        };

        let removed = self
            .explanations
            .delete_with_violation(&explanation, explanation.status, violation_update)
            .await?
            .ok_or_else(|| Self::concurrent_change(id))?;

        // Stored files go only once the rows are gone
        self.evidence.discard_files(&removed.evidence).await;
        log::debug!(
            "Removed {} evidence files of explanation {}",
            removed.evidence.len(),
            id
        );
        Ok(removed.violation_reopened)
    }

    pub async fn latest_for_violation(
        &self,
        violation_id: Uuid,
        actor: &UserProfile,
    ) -> Result<Option<Explanation>, AppError> {
        let violation = self.load_violation(violation_id).await?;
        if !actor.can_access_user_resource(violation.user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view explanations of your own violations".to_string(),
            ));
        }

        let explanations = self
            .explanations
            .list(&ExplanationFilter {
                violation_id: Some(violation_id),
                ..ExplanationFilter::default()
            })
            .await?;
        Ok(explanations.into_iter().next())
    }

    pub async fn list_by_submitter(
        &self,
        submitter_id: Uuid,
        actor: &UserProfile,
    ) -> Result<Vec<Explanation>, AppError> {
        if !actor.can_access_user_resource(submitter_id) {
            return Err(AppError::PermissionDenied(
                "You can only list your own explanations".to_string(),
            ));
        }

        Ok(self
            .explanations
            .list(&ExplanationFilter {
                submitted_by: Some(submitter_id),
                ..ExplanationFilter::default()
            })
            .await?)
    }

    pub async fn pending_review(&self, actor: &UserProfile) -> Result<Vec<Explanation>, AppError> {
        require_manager(actor)?;

        let explanations = self.explanations.list(&ExplanationFilter::default()).await?;
        Ok(explanations
            .into_iter()
            .filter(|e| e.is_pending_review())
            .collect())
    }

    pub async fn overdue_for_review(
        &self,
        actor: &UserProfile,
        today: NaiveDate,
    ) -> Result<Vec<Explanation>, AppError> {
        let pending = self.pending_review(actor).await?;
        Ok(pending
            .into_iter()
            .filter(|e| e.is_overdue_for_review(today, self.config.review_overdue_days))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explanation_text_is_trimmed_and_bounded() {
        assert_eq!(
            validate_explanation_text("   traffic jam on the bridge  ").unwrap(),
            "traffic jam on the bridge"
        );
        assert!(validate_explanation_text("too short").is_err());
        assert!(validate_explanation_text("          x         ").is_err());
        assert!(validate_explanation_text(&"a".repeat(2000)).is_ok());
        assert!(validate_explanation_text(&"a".repeat(2001)).is_err());
    }
}
