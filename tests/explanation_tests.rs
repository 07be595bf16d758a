use std::sync::Arc;

use async_trait::async_trait;
use attendance_payroll::database::models::{
    Explanation, ExplanationFilter, ExplanationStatus, NewExplanation, RemovedExplanation,
    Violation, ViolationStatus,
};
use attendance_payroll::database::repositories::{
    self as repos, MemoryStore, ViolationRepository, ViolationUpdate,
};
use attendance_payroll::services::FileStorage;
use attendance_payroll::{AppError, AppState, Repositories};
use pretty_assertions::assert_eq;
use uuid::Uuid;

mod common;

use common::{TestContext, date, pdf_upload};

const REASON: &str = "The metro line was closed for maintenance";

async fn violation_status(ctx: &TestContext, id: Uuid) -> ViolationStatus {
    ctx.store.find(id).await.unwrap().unwrap().status
}

#[actix_web::test]
async fn test_submit_review_and_approve() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let mut html = pdf_upload("page.html", 100);
    html.content_type = "text/html".to_string();
    let submitted = ctx
        .state
        .explanation_service
        .submit(
            violation.id,
            &employee,
            REASON,
            vec![pdf_upload("ticket.pdf", 1024), html],
        )
        .await
        .unwrap();

    assert_eq!(submitted.explanation.status, ExplanationStatus::Submitted);
    assert_eq!(submitted.evidence.len(), 1);
    assert_eq!(submitted.evidence_failures.len(), 1);
    assert_eq!(submitted.evidence_failures[0].key, "page.html");
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::ExplanationSubmitted
    );

    let explanation_id = submitted.explanation.id;
    let in_review = ctx
        .state
        .explanation_service
        .start_review(explanation_id, &manager)
        .await
        .unwrap();
    assert_eq!(in_review.status, ExplanationStatus::UnderReview);
    assert_eq!(in_review.reviewed_by, Some(manager.id));
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::UnderReview
    );

    let approved = ctx
        .state
        .explanation_service
        .approve(explanation_id, &manager, Some("Confirmed".to_string()))
        .await
        .unwrap();
    assert_eq!(approved.status, ExplanationStatus::Approved);
    assert_eq!(approved.is_valid, Some(true));
    assert!(approved.reviewed_at.is_some());

    let stored = ctx.store.find(violation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ViolationStatus::Approved);
    assert_eq!(stored.resolved_by, Some(manager.id));
    assert_eq!(stored.resolution_notes.as_deref(), Some("Confirmed"));

    let again = ctx
        .state
        .explanation_service
        .reject(explanation_id, &manager, None)
        .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));
}

#[actix_web::test]
async fn test_rejected_explanation_can_be_edited_and_resubmitted() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let submitted = ctx
        .state
        .explanation_service
        .submit(violation.id, &employee, REASON, Vec::new())
        .await
        .unwrap();
    let id = submitted.explanation.id;

    let early_edit = ctx
        .state
        .explanation_service
        .edit(id, &employee, "Adding more detail about the delay")
        .await;
    assert!(matches!(early_edit, Err(AppError::Conflict(_))));

    let rejected = ctx
        .state
        .explanation_service
        .reject(id, &manager, Some("Need a ticket".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.is_valid, Some(false));
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::Rejected
    );

    let edited = ctx
        .state
        .explanation_service
        .edit(id, &employee, "  Attached the closure notice from the operator  ")
        .await
        .unwrap();
    assert_eq!(edited.status, ExplanationStatus::Submitted);
    assert_eq!(
        edited.explanation_text,
        "Attached the closure notice from the operator"
    );
    assert!(edited.reviewed_by.is_none());
    assert!(edited.review_notes.is_none());
    assert!(edited.is_valid.is_none());
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::ExplanationSubmitted
    );
}

#[actix_web::test]
async fn test_request_more_info_moves_violation_under_review() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let submitted = ctx
        .state
        .explanation_service
        .submit(violation.id, &employee, REASON, Vec::new())
        .await
        .unwrap();

    let asked = ctx
        .state
        .explanation_service
        .request_more_info(submitted.explanation.id, &manager, Some("Which line?".to_string()))
        .await
        .unwrap();

    assert_eq!(asked.status, ExplanationStatus::RequiresMoreInfo);
    assert!(asked.is_valid.is_none());
    assert!(asked.can_be_edited());
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::UnderReview
    );

    let pending = ctx
        .state
        .explanation_service
        .pending_review(&manager)
        .await
        .unwrap();
    assert!(pending.is_empty());
}

#[actix_web::test]
async fn test_submission_rules() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let colleague = ctx.employee().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let short = ctx
        .state
        .explanation_service
        .submit(violation.id, &employee, "late", Vec::new())
        .await;
    assert!(matches!(short, Err(AppError::BadRequest(_))));

    let not_owner = ctx
        .state
        .explanation_service
        .submit(violation.id, &colleague, REASON, Vec::new())
        .await;
    assert!(matches!(not_owner, Err(AppError::PermissionDenied(_))));

    ctx.state
        .explanation_service
        .submit(violation.id, &employee, REASON, Vec::new())
        .await
        .unwrap();
    let twice = ctx
        .state
        .explanation_service
        .submit(violation.id, &employee, REASON, Vec::new())
        .await;
    assert!(matches!(twice, Err(AppError::Conflict(_))));

    let missing = ctx
        .state
        .explanation_service
        .submit(Uuid::new_v4(), &employee, REASON, Vec::new())
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[actix_web::test]
async fn test_reviewers_cannot_review_their_own_explanation() {
    let ctx = TestContext::new().await;
    let manager = ctx.manager().await;
    let employee = ctx.employee().await;
    let violation = ctx.late_violation(&manager, date(2024, 3, 4)).await;
    let other = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let own = ctx
        .state
        .explanation_service
        .submit(violation.id, &manager, REASON, Vec::new())
        .await
        .unwrap();
    let by_self = ctx
        .state
        .explanation_service
        .start_review(own.explanation.id, &manager)
        .await;
    assert!(matches!(by_self, Err(AppError::PermissionDenied(_))));

    let theirs = ctx
        .state
        .explanation_service
        .submit(other.id, &employee, REASON, Vec::new())
        .await
        .unwrap();
    let by_employee = ctx
        .state
        .explanation_service
        .approve(theirs.explanation.id, &employee, None)
        .await;
    assert!(matches!(by_employee, Err(AppError::PermissionDenied(_))));
}

#[actix_web::test]
async fn test_delete_purges_evidence_and_reopens_violation() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let submitted = ctx
        .state
        .explanation_service
        .submit(
            violation.id,
            &employee,
            REASON,
            vec![pdf_upload("ticket.pdf", 2048), pdf_upload("notice.pdf", 512)],
        )
        .await
        .unwrap();
    assert_eq!(ctx.storage.file_count().await, 2);
    let stored_path = submitted.evidence[0].storage_path.clone();
    assert!(ctx.storage.contains(&stored_path).await);

    let reopened = ctx
        .state
        .explanation_service
        .delete(submitted.explanation.id, &employee)
        .await
        .unwrap();

    assert!(reopened);
    assert_eq!(ctx.storage.file_count().await, 0);
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::PendingExplanation
    );
    let gone = ctx
        .state
        .explanation_service
        .get(submitted.explanation.id, &employee)
        .await;
    assert!(matches!(gone, Err(AppError::NotFound(_))));
}

#[actix_web::test]
async fn test_explanations_under_review_cannot_be_deleted() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let submitted = ctx
        .state
        .explanation_service
        .submit(violation.id, &employee, REASON, Vec::new())
        .await
        .unwrap();
    ctx.state
        .explanation_service
        .start_review(submitted.explanation.id, &manager)
        .await
        .unwrap();

    let result = ctx
        .state
        .explanation_service
        .delete(submitted.explanation.id, &employee)
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let latest = ctx
        .state
        .explanation_service
        .latest_for_violation(violation.id, &employee)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, submitted.explanation.id);

    let mine = ctx
        .state
        .explanation_service
        .list_by_submitter(employee.id, &employee)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
}

#[actix_web::test]
async fn test_overdue_for_review_uses_review_window() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let submitted = ctx
        .state
        .explanation_service
        .submit(violation.id, &employee, REASON, Vec::new())
        .await
        .unwrap();
    let today = submitted.explanation.submitted_at.date_naive();
    let service = &ctx.state.explanation_service;

    assert!(service.overdue_for_review(&manager, today).await.unwrap().is_empty());

    let later = today + chrono::Duration::days(ctx.config.detection.review_overdue_days + 1);
    let overdue = service.overdue_for_review(&manager, later).await.unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, submitted.explanation.id);

    let by_employee = service.overdue_for_review(&employee, later).await;
    assert!(matches!(by_employee, Err(AppError::PermissionDenied(_))));
}

/// Explanation storage where every guarded delete finds the status already moved on
struct ReviewWinsRace {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl repos::ExplanationRepository for ReviewWinsRace {
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<Explanation>> {
        repos::ExplanationRepository::find(self.store.as_ref(), id).await
    }

    async fn list(&self, filter: &ExplanationFilter) -> anyhow::Result<Vec<Explanation>> {
        repos::ExplanationRepository::list(self.store.as_ref(), filter).await
    }

    async fn create_with_violation(
        &self,
        input: NewExplanation,
        violation: &Violation,
        expected: ViolationStatus,
    ) -> anyhow::Result<Option<Explanation>> {
        repos::ExplanationRepository::create_with_violation(
            self.store.as_ref(),
            input,
            violation,
            expected,
        )
        .await
    }

    async fn save_with_violation(
        &self,
        explanation: &Explanation,
        expected: ExplanationStatus,
        violation: ViolationUpdate<'_>,
    ) -> anyhow::Result<Option<Explanation>> {
        repos::ExplanationRepository::save_with_violation(
            self.store.as_ref(),
            explanation,
            expected,
            violation,
        )
        .await
    }

    async fn delete_with_violation(
        &self,
        _explanation: &Explanation,
        _expected: ExplanationStatus,
        _violation: ViolationUpdate<'_>,
    ) -> anyhow::Result<Option<RemovedExplanation>> {
        Ok(None)
    }
}

#[actix_web::test]
async fn test_failed_delete_keeps_evidence() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let violation = ctx.late_violation(&employee, date(2024, 3, 4)).await;

    let submitted = ctx
        .state
        .explanation_service
        .submit(
            violation.id,
            &employee,
            REASON,
            vec![pdf_upload("ticket.pdf", 2048), pdf_upload("notice.pdf", 512)],
        )
        .await
        .unwrap();

    let mut repositories = Repositories::in_memory(ctx.store.clone());
    repositories.explanations = Arc::new(ReviewWinsRace {
        store: ctx.store.clone(),
    });
    let storage: Arc<dyn FileStorage> = ctx.storage.clone();
    let racing = AppState::new(repositories, storage, &ctx.config);

    let result = racing
        .explanation_service
        .delete(submitted.explanation.id, &employee)
        .await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(ctx.storage.file_count().await, 2);
    assert!(ctx.storage.contains(&submitted.evidence[0].storage_path).await);
    assert_eq!(
        ctx.state
            .evidence_service
            .total_size_for_explanation(submitted.explanation.id)
            .await
            .unwrap(),
        2560
    );
    assert_eq!(
        violation_status(&ctx, violation.id).await,
        ViolationStatus::ExplanationSubmitted
    );
}
