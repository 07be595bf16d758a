use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::string_enum;
use crate::error::AppError;

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[serde(rename_all = "snake_case")]
    pub enum ViolationType {
        LateArrival => "late_arrival",
        EarlyDeparture => "early_departure",
        MissingCheckIn => "missing_check_in",
        MissingCheckOut => "missing_check_out",
        AbsentWithoutLeave => "absent_without_leave",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[serde(rename_all = "snake_case")]
    pub enum ViolationSeverity {
        Minor => "minor",
        Moderate => "moderate",
        Major => "major",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[serde(rename_all = "snake_case")]
    pub enum ViolationStatus {
        PendingExplanation => "pending_explanation",
        ExplanationSubmitted => "explanation_submitted",
        UnderReview => "under_review",
        Approved => "approved",
        Rejected => "rejected",
        Resolved => "resolved",
        Escalated => "escalated",
    }
}

impl ViolationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ViolationStatus::Approved | ViolationStatus::Resolved | ViolationStatus::Escalated
        )
    }

    pub fn can_transition_to(&self, next: ViolationStatus) -> bool {
        use ViolationStatus::*;

        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Resolved | Escalated) => true,
            (PendingExplanation | Rejected | UnderReview, ExplanationSubmitted) => true,
            (ExplanationSubmitted, UnderReview) => true,
            (ExplanationSubmitted | UnderReview, Approved | Rejected) => true,
            (ExplanationSubmitted | UnderReview | Rejected, PendingExplanation) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: Uuid,                         // UUID primary key
    pub user_id: Uuid,                    // UUID for user references
    pub shift_assignment_id: Uuid,        // UUID for shift_assignments references
    pub attendance_log_id: Option<Uuid>,  // UUID for attendance_logs references
    pub violation_date: NaiveDate,        // DATE
    pub violation_type: ViolationType,
    pub severity: ViolationSeverity,
    pub expected_time: NaiveTime,         // TIME
    pub actual_time: Option<NaiveTime>,   // TIME
    pub deviation_minutes: i32,
    pub status: ViolationStatus,
    pub auto_detected: bool,
    pub description: String,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>, // TIMESTAMPTZ
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>, // TIMESTAMPTZ
    pub updated_at: DateTime<Utc>, // TIMESTAMPTZ
}

impl Violation {
    pub fn needs_explanation(&self) -> bool {
        self.status == ViolationStatus::PendingExplanation
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self.status,
            ViolationStatus::Resolved | ViolationStatus::Approved
        )
    }

    pub fn can_be_explained(&self) -> bool {
        matches!(
            self.status,
            ViolationStatus::PendingExplanation | ViolationStatus::Rejected
        )
    }

    pub fn days_since_violation(&self, today: NaiveDate) -> i64 {
        (today - self.violation_date).num_days()
    }

    pub fn is_overdue_for_explanation(&self, today: NaiveDate, max_days: i64) -> bool {
        self.needs_explanation() && self.days_since_violation(today) > max_days
    }

    /// Move to `next`, returning the status the change was made from.
    ///
    /// The caller persists the result with a compare-and-set on the returned status.
    pub fn transition_to(&mut self, next: ViolationStatus) -> Result<ViolationStatus, AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Violation {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        let previous = self.status;
        self.status = next;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    pub fn view(self, today: NaiveDate, overdue_after_days: i64) -> ViolationView {
        ViolationView {
            needs_explanation: self.needs_explanation(),
            is_resolved: self.is_resolved(),
            can_be_explained: self.can_be_explained(),
            days_since_violation: self.days_since_violation(today),
            is_overdue_for_explanation: self.is_overdue_for_explanation(today, overdue_after_days),
            violation: self,
        }
    }
}

/// A violation together with its read-time derived flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationView {
    #[serde(flatten)]
    pub violation: Violation,
    pub needs_explanation: bool,
    pub is_resolved: bool,
    pub can_be_explained: bool,
    pub days_since_violation: i64,
    pub is_overdue_for_explanation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewViolation {
    pub user_id: Uuid,
    pub shift_assignment_id: Uuid,
    pub attendance_log_id: Option<Uuid>,
    pub violation_date: NaiveDate,
    pub violation_type: ViolationType,
    pub severity: ViolationSeverity,
    pub expected_time: NaiveTime,
    pub actual_time: Option<NaiveTime>,
    pub deviation_minutes: i32,
    pub description: String,
    pub auto_detected: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<ViolationStatus>,
    pub violation_type: Option<ViolationType>,
    pub severity: Option<ViolationSeverity>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ViolationFilter {
    pub fn matches(&self, violation: &Violation) -> bool {
        self.user_id.is_none_or(|id| violation.user_id == id)
            && self.status.is_none_or(|s| violation.status == s)
            && self.violation_type.is_none_or(|t| violation.violation_type == t)
            && self.severity.is_none_or(|s| violation.severity == s)
            && self.start_date.is_none_or(|d| violation.violation_date >= d)
            && self.end_date.is_none_or(|d| violation.violation_date <= d)
    }
}
