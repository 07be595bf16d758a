use actix_web::{HttpResponse, Result, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::handlers::evidence::{EvidenceFileRequest, decode_files};
use crate::handlers::shared::{ApiResponse, NotesRequest};
use crate::services::UserContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExplanationRequest {
    pub explanation_text: String,
    #[serde(default)]
    pub files: Vec<EvidenceFileRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditExplanationRequest {
    pub explanation_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteExplanationResponse {
    pub explanation_id: Uuid,
    pub violation_reopened: bool,
}

pub async fn submit_explanation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<SubmitExplanationRequest>,
) -> Result<HttpResponse> {
    let violation_id = path.into_inner();
    let input = input.into_inner();
    let files = decode_files(input.files)?;

    let submitted = state
        .explanation_service
        .submit(
            violation_id,
            user_context.profile(),
            &input.explanation_text,
            files,
        )
        .await
        .map_err(|e| {
            log::error!(
                "Failed to submit explanation for violation {}: {}",
                violation_id,
                e
            );
            e
        })?;

    Ok(ApiResponse::created(submitted))
}

pub async fn latest_for_violation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .latest_for_violation(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn get_explanation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .get(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn edit_explanation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<EditExplanationRequest>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .edit(
            path.into_inner(),
            user_context.profile(),
            &input.explanation_text,
        )
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn delete_explanation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let explanation_id = path.into_inner();

    let violation_reopened = state
        .explanation_service
        .delete(explanation_id, user_context.profile())
        .await?;

    Ok(ApiResponse::success(DeleteExplanationResponse {
        explanation_id,
        violation_reopened,
    }))
}

pub async fn start_review(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .start_review(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn approve_explanation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<NotesRequest>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .approve(
            path.into_inner(),
            user_context.profile(),
            input.into_inner().notes,
        )
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn reject_explanation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<NotesRequest>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .reject(
            path.into_inner(),
            user_context.profile(),
            input.into_inner().notes,
        )
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn request_more_info(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<NotesRequest>,
) -> Result<HttpResponse> {
    let explanation = state
        .explanation_service
        .request_more_info(
            path.into_inner(),
            user_context.profile(),
            input.into_inner().notes,
        )
        .await?;

    Ok(ApiResponse::success(explanation))
}

pub async fn my_explanations(
    user_context: UserContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let explanations = state
        .explanation_service
        .list_by_submitter(user_context.user_id(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(explanations))
}

pub async fn pending_review(
    user_context: UserContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let explanations = state
        .explanation_service
        .pending_review(user_context.profile())
        .await?;

    Ok(ApiResponse::success(explanations))
}

pub async fn overdue_for_review(
    user_context: UserContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let explanations = state
        .explanation_service
        .overdue_for_review(user_context.profile(), Utc::now().date_naive())
        .await?;

    Ok(ApiResponse::success(explanations))
}
