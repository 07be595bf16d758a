use actix_web::{HttpResponse, Result, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::ViolationFilter;
use crate::handlers::shared::{ApiResponse, DateRangeQuery, NotesRequest};
use crate::services::UserContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
    pub reason: String,
}

pub async fn list_violations(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<ViolationFilter>,
) -> Result<HttpResponse> {
    let violations = state
        .violation_service
        .list(query.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(violations))
}

pub async fn get_violation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let violation = state
        .violation_service
        .get(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(violation))
}

pub async fn resolve_violation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<NotesRequest>,
) -> Result<HttpResponse> {
    let violation_id = path.into_inner();

    let violation = state
        .violation_service
        .resolve(violation_id, user_context.profile(), input.into_inner().notes)
        .await
        .map_err(|e| {
            log::error!("Failed to resolve violation {}: {}", violation_id, e);
            e
        })?;

    Ok(ApiResponse::success(violation))
}

pub async fn escalate_violation(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<EscalateRequest>,
) -> Result<HttpResponse> {
    let violation = state
        .violation_service
        .escalate(
            path.into_inner(),
            user_context.profile(),
            input.into_inner().reason,
        )
        .await?;

    Ok(ApiResponse::success(violation))
}

pub async fn my_dashboard(
    user_context: UserContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let dashboard = state
        .violation_service
        .user_dashboard(user_context.user_id(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(dashboard))
}

pub async fn user_dashboard(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let dashboard = state
        .violation_service
        .user_dashboard(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(dashboard))
}

pub async fn manager_dashboard(
    user_context: UserContext,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let dashboard = state
        .violation_service
        .manager_dashboard(user_context.profile())
        .await?;

    Ok(ApiResponse::success(dashboard))
}

pub async fn violation_statistics(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse> {
    let stats = state
        .violation_service
        .statistics(query.start_date, query.end_date, user_context.profile())
        .await?;

    Ok(ApiResponse::success(stats))
}
