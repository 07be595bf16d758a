use attendance_payroll::AppError;
use attendance_payroll::database::models::{EvidenceKind, Explanation, UserProfile};
use attendance_payroll::services::MemoryFileStorage;
use pretty_assertions::assert_eq;

mod common;

use common::{TestContext, date, image_upload, pdf_upload, test_config};

const MB: usize = 1024 * 1024;

async fn explanation_for(ctx: &TestContext, employee: &UserProfile) -> Explanation {
    let violation = ctx.late_violation(employee, date(2024, 3, 4)).await;
    ctx.state
        .explanation_service
        .submit(
            violation.id,
            employee,
            "Stuck behind an accident on the ring road",
            Vec::new(),
        )
        .await
        .unwrap()
        .explanation
}

#[actix_web::test]
async fn test_per_file_limits() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let explanation = explanation_for(&ctx, &employee).await;
    let evidence = &ctx.state.evidence_service;

    let too_big = evidence
        .upload(explanation.id, pdf_upload("scan.pdf", 2 * MB + 1))
        .await;
    assert!(matches!(too_big, Err(AppError::BadRequest(_))));

    let mut script = pdf_upload("run.sh", 10);
    script.content_type = "application/x-sh".to_string();
    let wrong_type = evidence.upload(explanation.id, script).await;
    assert!(matches!(wrong_type, Err(AppError::BadRequest(_))));

    let empty = evidence.upload(explanation.id, pdf_upload("empty.pdf", 0)).await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let long_name = format!("{}.pdf", "a".repeat(300));
    let named = evidence.upload(explanation.id, pdf_upload(&long_name, 10)).await;
    assert!(matches!(named, Err(AppError::BadRequest(_))));

    let at_limit = evidence
        .upload(explanation.id, pdf_upload("scan.pdf", 2 * MB))
        .await
        .unwrap();
    assert_eq!(at_limit.file_size, (2 * MB) as i64);
    assert_eq!(ctx.storage.file_count().await, 1);
}

#[actix_web::test]
async fn test_total_cap_per_explanation() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let explanation = explanation_for(&ctx, &employee).await;

    let batch = ctx
        .state
        .evidence_service
        .upload_many(
            explanation.id,
            vec![
                pdf_upload("one.pdf", 2 * MB),
                pdf_upload("two.pdf", 2 * MB),
                pdf_upload("three.pdf", MB + MB / 2),
                pdf_upload("four.pdf", MB),
            ],
        )
        .await;

    assert_eq!(batch.succeeded.len(), 3);
    assert_eq!(batch.failed.len(), 1);
    assert_eq!(batch.failed[0].key, "three.pdf");
    assert!(!batch.is_complete_success());
    assert_eq!(
        ctx.state
            .evidence_service
            .total_size_for_explanation(explanation.id)
            .await
            .unwrap(),
        (5 * MB) as i64
    );
    // Rejected files never reach storage
    assert_eq!(ctx.storage.file_count().await, 3);
}

#[actix_web::test]
async fn test_kind_detection_and_stored_names() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let explanation = explanation_for(&ctx, &employee).await;

    let photo = ctx
        .state
        .evidence_service
        .upload(explanation.id, image_upload("Receipt.PNG", 300))
        .await
        .unwrap();
    let document = ctx
        .state
        .evidence_service
        .upload(explanation.id, pdf_upload("letter.pdf", 300))
        .await
        .unwrap();

    assert_eq!(photo.kind, EvidenceKind::Image);
    assert_eq!(photo.original_filename, "Receipt.PNG");
    assert!(photo.stored_filename.ends_with(".png"));
    assert_ne!(photo.stored_filename, photo.original_filename);
    assert_eq!(photo.description.as_deref(), Some("photo"));
    assert_eq!(document.kind, EvidenceKind::Document);
    assert!(!document.is_verified);
}

#[actix_web::test]
async fn test_access_control() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let colleague = ctx.employee().await;
    let manager = ctx.manager().await;
    let explanation = explanation_for(&ctx, &employee).await;
    let evidence = ctx
        .state
        .evidence_service
        .upload(explanation.id, pdf_upload("ticket.pdf", 64))
        .await
        .unwrap();

    let service = &ctx.state.evidence_service;
    assert!(service.can_access(&evidence, &employee).await.unwrap());
    assert!(service.can_access(&evidence, &manager).await.unwrap());
    assert!(!service.can_access(&evidence, &colleague).await.unwrap());

    let listed = service
        .list_for_explanation(explanation.id, &colleague)
        .await;
    assert!(matches!(listed, Err(AppError::PermissionDenied(_))));
    let download = service.download_url(evidence.id, &colleague).await;
    assert!(matches!(download, Err(AppError::PermissionDenied(_))));

    let url = service.download_url(evidence.id, &employee).await.unwrap();
    assert!(url.contains("?expires="));
}

#[actix_web::test]
async fn test_download_url_falls_back_without_signing() {
    let ctx = TestContext::with_config(test_config(), MemoryFileStorage::without_signing()).await;
    let employee = ctx.employee().await;
    let explanation = explanation_for(&ctx, &employee).await;
    let evidence = ctx
        .state
        .evidence_service
        .upload(explanation.id, pdf_upload("ticket.pdf", 64))
        .await
        .unwrap();

    let url = ctx
        .state
        .evidence_service
        .download_url(evidence.id, &employee)
        .await
        .unwrap();

    let prefix = format!("{}?token=", evidence.file_url);
    assert!(url.starts_with(&prefix));
    assert!(uuid::Uuid::parse_str(&url[prefix.len()..]).is_ok());
}

#[actix_web::test]
async fn test_verify_and_delete() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let explanation = explanation_for(&ctx, &employee).await;
    let service = &ctx.state.evidence_service;

    let first = service
        .upload(explanation.id, pdf_upload("first.pdf", 64))
        .await
        .unwrap();
    let second = service
        .upload(explanation.id, pdf_upload("second.pdf", 64))
        .await
        .unwrap();
    assert_eq!(service.list_unverified(&manager).await.unwrap().len(), 2);

    let denied = service.verify(first.id, &employee).await;
    assert!(matches!(denied, Err(AppError::PermissionDenied(_))));

    let verified = service.verify(first.id, &manager).await.unwrap();
    assert!(verified.is_verified);
    assert_eq!(verified.verified_by, Some(manager.id));
    assert_eq!(service.list_unverified(&manager).await.unwrap().len(), 1);

    service.delete(second.id, &employee).await.unwrap();
    assert!(!ctx.storage.contains(&second.storage_path).await);
    let missing = service.delete(second.id, &employee).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    ctx.state
        .explanation_service
        .start_review(explanation.id, &manager)
        .await
        .unwrap();
    let locked = service.delete(first.id, &employee).await;
    assert!(matches!(locked, Err(AppError::PermissionDenied(_))));
    service.delete(first.id, &manager).await.unwrap();
    assert_eq!(ctx.storage.file_count().await, 0);
}

#[actix_web::test]
async fn test_uploads_close_once_review_starts() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let manager = ctx.manager().await;
    let explanation = explanation_for(&ctx, &employee).await;
    let explanations = &ctx.state.explanation_service;
    let evidence = &ctx.state.evidence_service;

    explanations.start_review(explanation.id, &manager).await.unwrap();
    let under_review = evidence.upload(explanation.id, pdf_upload("late.pdf", 64)).await;
    assert!(matches!(under_review, Err(AppError::Conflict(_))));

    explanations
        .request_more_info(explanation.id, &manager, Some("Add the ticket".to_string()))
        .await
        .unwrap();
    evidence
        .upload(explanation.id, pdf_upload("ticket.pdf", 64))
        .await
        .unwrap();

    explanations
        .edit(explanation.id, &employee, "Ticket attached from the operator")
        .await
        .unwrap();
    explanations
        .approve(explanation.id, &manager, None)
        .await
        .unwrap();
    let approved = evidence.upload(explanation.id, pdf_upload("extra.pdf", 64)).await;
    assert!(matches!(approved, Err(AppError::Conflict(_))));
    assert_eq!(ctx.storage.file_count().await, 1);
}

#[actix_web::test]
async fn test_delete_for_explanation_purges_rows_and_files() {
    let ctx = TestContext::new().await;
    let employee = ctx.employee().await;
    let explanation = explanation_for(&ctx, &employee).await;
    let service = &ctx.state.evidence_service;

    service
        .upload_many(
            explanation.id,
            vec![pdf_upload("one.pdf", 128), image_upload("two.png", 256)],
        )
        .await;
    assert_eq!(ctx.storage.file_count().await, 2);

    assert_eq!(service.delete_for_explanation(explanation.id).await.unwrap(), 2);
    assert_eq!(service.total_size_for_explanation(explanation.id).await.unwrap(), 0);
    assert_eq!(ctx.storage.file_count().await, 0);
}
