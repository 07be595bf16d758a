use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::database::models::{
    ManagerDashboard, UserProfile, Violation, ViolationDashboard, ViolationFilter,
    ViolationStatistics, ViolationStatus, ViolationView,
};
use crate::database::repositories::ViolationRepository;
use crate::error::AppError;

const RECENT_VIOLATIONS: usize = 5;

pub(crate) fn require_manager(actor: &UserProfile) -> Result<(), AppError> {
    if actor.is_manager_or_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(
            "Manager or admin role required".to_string(),
        ))
    }
}

#[derive(Clone)]
pub struct ViolationService {
    violations: Arc<dyn ViolationRepository>,
    config: DetectionConfig,
}

impl ViolationService {
    pub fn new(violations: Arc<dyn ViolationRepository>, config: DetectionConfig) -> Self {
        Self { violations, config }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn view(&self, violation: Violation) -> ViolationView {
        violation.view(Self::today(), self.config.explanation_overdue_days)
    }

    async fn load(&self, id: Uuid) -> Result<Violation, AppError> {
        self.violations
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Violation", id))
    }

    /// Get a violation the actor is allowed to see
    pub async fn get(&self, id: Uuid, actor: &UserProfile) -> Result<ViolationView, AppError> {
        let violation = self.load(id).await?;

        if !actor.can_access_user_resource(violation.user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own violations".to_string(),
            ));
        }

        Ok(self.view(violation))
    }

    /// Employees only ever see their own violations, whatever the filter says
    pub async fn list(
        &self,
        mut filter: ViolationFilter,
        actor: &UserProfile,
    ) -> Result<Vec<ViolationView>, AppError> {
        if !actor.is_manager_or_admin() {
            filter.user_id = Some(actor.id);
        }

        let violations = self.violations.list(&filter).await?;
        Ok(violations.into_iter().map(|v| self.view(v)).collect())
    }

    pub async fn resolve(
        &self,
        id: Uuid,
        resolver: &UserProfile,
        notes: Option<String>,
    ) -> Result<ViolationView, AppError> {
        let mut violation = self.load(id).await?;
        self.check_can_close(&violation, resolver)?;

        if violation.status == ViolationStatus::Resolved {
            return Err(AppError::Conflict(format!(
                "Violation {} is already resolved",
                id
            )));
        }

        let previous = violation.transition_to(ViolationStatus::Resolved)?;
        violation.resolved_by = Some(resolver.id);
        violation.resolved_at = Some(Utc::now());
        violation.resolution_notes = notes;

        let saved = self.persist(&violation, previous).await?;
        log::info!("Violation {} resolved by {}", id, resolver.id);
        Ok(self.view(saved))
    }

    pub async fn escalate(
        &self,
        id: Uuid,
        actor: &UserProfile,
        reason: String,
    ) -> Result<ViolationView, AppError> {
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(AppError::BadRequest(
                "An escalation reason is required".to_string(),
            ));
        }

        let mut violation = self.load(id).await?;
        self.check_can_close(&violation, actor)?;

        let previous = violation.transition_to(ViolationStatus::Escalated)?;
        violation.resolved_by = Some(actor.id);
        violation.resolution_notes = Some(reason);

        let saved = self.persist(&violation, previous).await?;
        log::info!("Violation {} escalated by {}", id, actor.id);
        Ok(self.view(saved))
    }

    fn check_can_close(&self, violation: &Violation, actor: &UserProfile) -> Result<(), AppError> {
        require_manager(actor)?;
        if violation.user_id == actor.id {
            return Err(AppError::PermissionDenied(
                "You cannot close your own violation".to_string(),
            ));
        }
        Ok(())
    }

    async fn persist(
        &self,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> Result<Violation, AppError> {
        self.violations
            .save_transition(violation, expected)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Violation {} was modified concurrently",
                    violation.id
                ))
            })
    }

    pub async fn user_dashboard(
        &self,
        user_id: Uuid,
        actor: &UserProfile,
    ) -> Result<ViolationDashboard, AppError> {
        if !actor.can_access_user_resource(user_id) {
            return Err(AppError::PermissionDenied(
                "You can only view your own dashboard".to_string(),
            ));
        }

        let violations = self
            .violations
            .list(&ViolationFilter {
                user_id: Some(user_id),
                ..ViolationFilter::default()
            })
            .await?;

        let mut counts_by_status = BTreeMap::new();
        for violation in &violations {
            *counts_by_status.entry(violation.status).or_insert(0) += 1;
        }

        Ok(ViolationDashboard {
            user_id,
            counts_by_status,
            total: violations.len(),
            recent: violations
                .into_iter()
                .take(RECENT_VIOLATIONS)
                .map(|v| self.view(v))
                .collect(),
        })
    }

    pub async fn manager_dashboard(
        &self,
        actor: &UserProfile,
    ) -> Result<ManagerDashboard, AppError> {
        require_manager(actor)?;

        let pending_explanation: Vec<_> = self
            .list_by_status(ViolationStatus::PendingExplanation)
            .await?;

        let mut pending_review = self
            .list_by_status(ViolationStatus::ExplanationSubmitted)
            .await?;
        pending_review.extend(self.list_by_status(ViolationStatus::UnderReview).await?);

        let overdue = pending_explanation
            .iter()
            .filter(|v| v.is_overdue_for_explanation)
            .cloned()
            .collect();

        Ok(ManagerDashboard {
            pending_explanation,
            pending_review,
            overdue,
        })
    }

    async fn list_by_status(&self, status: ViolationStatus) -> Result<Vec<ViolationView>, AppError> {
        let violations = self
            .violations
            .list(&ViolationFilter {
                status: Some(status),
                ..ViolationFilter::default()
            })
            .await?;
        Ok(violations.into_iter().map(|v| self.view(v)).collect())
    }

    pub async fn statistics(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        actor: &UserProfile,
    ) -> Result<ViolationStatistics, AppError> {
        require_manager(actor)?;
        if start_date > end_date {
            return Err(AppError::BadRequest(format!(
                "Start date {} is after end date {}",
                start_date, end_date
            )));
        }

        let violations = self
            .violations
            .list(&ViolationFilter {
                start_date: Some(start_date),
                end_date: Some(end_date),
                ..ViolationFilter::default()
            })
            .await?;

        let mut by_type = BTreeMap::new();
        let mut by_severity = BTreeMap::new();
        let mut by_user = BTreeMap::new();
        for violation in &violations {
            *by_type.entry(violation.violation_type).or_insert(0) += 1;
            *by_severity.entry(violation.severity).or_insert(0) += 1;
            *by_user.entry(violation.user_id).or_insert(0) += 1;
        }

        Ok(ViolationStatistics {
            start_date,
            end_date,
            total: violations.len(),
            by_type,
            by_severity,
            by_user,
        })
    }
}
