use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::handlers::shared::{ApiResponse, DateQuery, DateRangeQuery};
use crate::services::UserContext;
use crate::services::violations::require_manager;

/// Run the daily pass on demand, normally for yesterday
pub async fn run_detection(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse> {
    require_manager(user_context.profile())?;

    let summary = state
        .detection_service
        .run_daily_detection(query.date_or_today())
        .await
        .map_err(|e| {
            log::error!("Violation detection failed: {}", e);
            e
        })?;

    Ok(ApiResponse::success(summary))
}

pub async fn detect_for_user(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse> {
    require_manager(user_context.profile())?;

    let violations = state
        .detection_service
        .detect_for_user(path.into_inner(), query.date_or_today())
        .await?;

    Ok(ApiResponse::success(violations))
}

pub async fn reprocess_range(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse> {
    require_manager(user_context.profile())?;

    log::info!(
        "User {} requested detection reprocessing for {} to {}",
        user_context.user_id(),
        query.start_date,
        query.end_date
    );

    let summary = state
        .detection_service
        .reprocess(query.start_date, query.end_date)
        .await?;

    Ok(ApiResponse::success(summary))
}
