use actix_web::{HttpResponse, Result, web};
use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::AttendanceLogInput;
use crate::handlers::shared::{ApiResponse, DateRangeQuery};
use crate::services::UserContext;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockRequest {
    /// Defaults to the caller themselves
    pub user_id: Option<Uuid>,
    /// Local wall-clock time; defaults to now
    pub at: Option<NaiveDateTime>,
}

impl ClockRequest {
    fn resolve(&self, user_context: &UserContext) -> (Uuid, NaiveDateTime) {
        (
            self.user_id.unwrap_or_else(|| user_context.user_id()),
            self.at.unwrap_or_else(|| Local::now().naive_local()),
        )
    }
}

pub async fn check_in(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<ClockRequest>,
) -> Result<HttpResponse> {
    let (user_id, at) = input.resolve(&user_context);

    let log = state
        .attendance_service
        .check_in(user_id, at, user_context.profile())
        .await?;

    Ok(ApiResponse::created(log))
}

pub async fn check_out(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<ClockRequest>,
) -> Result<HttpResponse> {
    let (user_id, at) = input.resolve(&user_context);

    let log = state
        .attendance_service
        .check_out(user_id, at, user_context.profile())
        .await?;

    Ok(ApiResponse::success(log))
}

pub async fn record_attendance(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<AttendanceLogInput>,
) -> Result<HttpResponse> {
    let log = state
        .attendance_service
        .record(input.into_inner(), user_context.profile())
        .await
        .map_err(|e| {
            log::error!("Failed to record attendance: {}", e);
            e
        })?;

    Ok(ApiResponse::created(log))
}

pub async fn get_attendance_log(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let log = state
        .attendance_service
        .get(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(log))
}

pub async fn list_user_attendance(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse> {
    let logs = state
        .attendance_service
        .list_for_user(
            path.into_inner(),
            query.start_date,
            query.end_date,
            user_context.profile(),
        )
        .await?;

    Ok(ApiResponse::success(logs))
}
