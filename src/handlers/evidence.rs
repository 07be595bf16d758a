use actix_web::{HttpResponse, Result, web};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{EvidenceKind, EvidenceUpload};
use crate::error::AppError;
use crate::handlers::shared::ApiResponse;
use crate::services::UserContext;

/// A file carried inline in a JSON body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceFileRequest {
    pub file_name: String,
    pub content_type: String,
    /// Standard base64 of the file bytes
    pub content_base64: String,
    pub description: Option<String>,
    pub kind: Option<EvidenceKind>,
}

impl EvidenceFileRequest {
    pub fn decode(self) -> Result<EvidenceUpload, AppError> {
        let content = STANDARD.decode(self.content_base64.as_bytes()).map_err(|e| {
            AppError::BadRequest(format!("File {} is not valid base64: {}", self.file_name, e))
        })?;

        Ok(EvidenceUpload {
            file_name: self.file_name,
            content_type: self.content_type,
            content,
            description: self.description,
            kind: self.kind,
        })
    }
}

pub fn decode_files(files: Vec<EvidenceFileRequest>) -> Result<Vec<EvidenceUpload>, AppError> {
    files.into_iter().map(EvidenceFileRequest::decode).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEvidenceRequest {
    pub files: Vec<EvidenceFileRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlResponse {
    pub evidence_id: Uuid,
    pub url: String,
}

pub async fn upload_evidence(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<UploadEvidenceRequest>,
) -> Result<HttpResponse> {
    let explanation_id = path.into_inner();

    let explanation = state
        .explanation_service
        .get(explanation_id, user_context.profile())
        .await?;
    if explanation.submitted_by != user_context.user_id() && !user_context.is_manager_or_admin() {
        return Err(AppError::PermissionDenied(
            "You can only attach evidence to your own explanations".to_string(),
        )
        .into());
    }

    let uploads = decode_files(input.into_inner().files)?;
    let result = state
        .evidence_service
        .upload_many(explanation_id, uploads)
        .await;

    if !result.is_complete_success() {
        log::warn!(
            "{} evidence file(s) rejected for explanation {}",
            result.failed.len(),
            explanation_id
        );
    }

    Ok(ApiResponse::created(result))
}

pub async fn list_evidence(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let evidence = state
        .evidence_service
        .list_for_explanation(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(evidence))
}

pub async fn download_url(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let evidence_id = path.into_inner();

    let url = state
        .evidence_service
        .download_url(evidence_id, user_context.profile())
        .await?;

    Ok(ApiResponse::success(DownloadUrlResponse { evidence_id, url }))
}

pub async fn verify_evidence(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let evidence = state
        .evidence_service
        .verify(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(evidence))
}

pub async fn delete_evidence(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .evidence_service
        .delete(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success_message("Evidence deleted"))
}

pub async fn list_unverified(
    user_context: UserContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let evidence = state
        .evidence_service
        .list_unverified(user_context.profile())
        .await?;

    Ok(ApiResponse::success(evidence))
}
