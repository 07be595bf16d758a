use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{ShiftAssignmentInput, WorkShiftInput};
use crate::handlers::shared::{ApiResponse, DateQuery};
use crate::services::UserContext;

pub async fn create_shift(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<WorkShiftInput>,
) -> Result<HttpResponse> {
    let shift = state
        .shift_service
        .create_shift(input.into_inner(), user_context.profile())
        .await
        .map_err(|e| {
            log::error!("Failed to create shift: {}", e);
            e
        })?;

    Ok(ApiResponse::created(shift))
}

pub async fn get_shift(
    _user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let shift = state.shift_service.get_shift(path.into_inner()).await?;

    Ok(ApiResponse::success(shift))
}

pub async fn deactivate_shift(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let shift = state
        .shift_service
        .deactivate_shift(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(shift))
}

pub async fn create_assignment(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<ShiftAssignmentInput>,
) -> Result<HttpResponse> {
    let assignment = state
        .shift_service
        .create_assignment(input.into_inner(), user_context.profile())
        .await
        .map_err(|e| {
            log::error!("Failed to assign shift: {}", e);
            e
        })?;

    Ok(ApiResponse::created(assignment))
}

pub async fn deactivate_assignment(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let assignment = state
        .shift_service
        .deactivate_assignment(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(assignment))
}

pub async fn list_user_assignments(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let assignments = state
        .shift_service
        .list_assignments_for_user(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(assignments))
}

// Everyone expected at work on a given day
pub async fn scheduled_shifts(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse> {
    let scheduled = state
        .shift_service
        .scheduled_on(query.date_or_today(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(scheduled))
}
