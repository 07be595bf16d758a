use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Evidence;
use super::macros::string_enum;
use crate::error::AppError;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "snake_case")]
    pub enum ExplanationStatus {
        Submitted => "submitted",
        UnderReview => "under_review",
        Approved => "approved",
        Rejected => "rejected",
        RequiresMoreInfo => "requires_more_info",
    }
}

impl ExplanationStatus {
    pub fn is_pending_review(&self) -> bool {
        matches!(
            self,
            ExplanationStatus::Submitted | ExplanationStatus::UnderReview
        )
    }

    pub fn can_transition_to(&self, next: ExplanationStatus) -> bool {
        use ExplanationStatus::*;

        matches!(
            (self, next),
            (Submitted, UnderReview)
                | (Submitted | UnderReview, Approved | Rejected | RequiresMoreInfo)
                | (Rejected | RequiresMoreInfo, Submitted)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
    pub id: Uuid,           // UUID primary key
    pub violation_id: Uuid, // UUID for violations references
    pub submitted_by: Uuid, // UUID for user references
    pub explanation_text: String,
    pub status: ExplanationStatus,
    pub submitted_at: DateTime<Utc>, // TIMESTAMPTZ
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub is_valid: Option<bool>,
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl Explanation {
    pub fn is_pending_review(&self) -> bool {
        self.status.is_pending_review()
    }

    pub fn can_be_edited(&self) -> bool {
        matches!(
            self.status,
            ExplanationStatus::RequiresMoreInfo | ExplanationStatus::Rejected
        )
    }

    /// Anything not yet approved or under active review may be withdrawn
    pub fn can_be_deleted(&self) -> bool {
        self.status == ExplanationStatus::Submitted || self.can_be_edited()
    }

    pub fn days_since_submission(&self, today: NaiveDate) -> i64 {
        (today - self.submitted_at.date_naive()).num_days()
    }

    pub fn is_overdue_for_review(&self, today: NaiveDate, max_days: i64) -> bool {
        self.is_pending_review() && self.days_since_submission(today) > max_days
    }

    pub fn transition_to(
        &mut self,
        next: ExplanationStatus,
    ) -> Result<ExplanationStatus, AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Explanation {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let previous = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    /// Record a review decision on top of a status change
    pub fn record_review(
        &mut self,
        next: ExplanationStatus,
        reviewer_id: Uuid,
        notes: Option<String>,
        is_valid: Option<bool>,
    ) -> Result<ExplanationStatus, AppError> {
        let previous = self.transition_to(next)?;
        self.reviewed_by = Some(reviewer_id);
        self.reviewed_at = Some(Utc::now());
        self.review_notes = notes;
        self.is_valid = is_valid;
        Ok(previous)
    }

    /// Replace the text and return to `Submitted` with all review fields cleared
    pub fn resubmit(&mut self, text: String) -> Result<ExplanationStatus, AppError> {
        let previous = self.transition_to(ExplanationStatus::Submitted)?;
        self.explanation_text = text;
        self.submitted_at = Utc::now();
        self.reviewed_by = None;
        self.reviewed_at = None;
        self.review_notes = None;
        self.is_valid = None;
        Ok(previous)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExplanation {
    pub violation_id: Uuid,
    pub submitted_by: Uuid,
    pub explanation_text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationFilter {
    pub violation_id: Option<Uuid>,
    pub submitted_by: Option<Uuid>,
    pub status: Option<ExplanationStatus>,
}

impl ExplanationFilter {
    pub fn matches(&self, explanation: &Explanation) -> bool {
        self.violation_id.is_none_or(|id| explanation.violation_id == id)
            && self.submitted_by.is_none_or(|id| explanation.submitted_by == id)
            && self.status.is_none_or(|s| explanation.status == s)
    }
}

/// What a guarded explanation delete took with it.
#[derive(Debug, Clone, Default)]
pub struct RemovedExplanation {
    pub evidence: Vec<Evidence>,
    pub violation_reopened: bool,
}
