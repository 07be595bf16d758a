use actix_web::{HttpResponse, Result, web};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::database::models::{PayrollFilter, PayrollPeriod};
use crate::error::AppError;
use crate::handlers::shared::{ApiResponse, PeriodQuery};
use crate::services::UserContext;

const DEFAULT_TOP_EARNERS: usize = 10;
const DEFAULT_TREND_MONTHS: u32 = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatePayrollRequest {
    pub user_id: Uuid,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCalculateRequest {
    pub user_ids: Vec<Uuid>,
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkApproveRequest {
    pub payroll_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPayrollRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEarnersQuery {
    pub year: i32,
    pub month: u32,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsQuery {
    pub year: i32,
    pub month: u32,
    pub months: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearQuery {
    pub year: i32,
}

pub async fn calculate_payroll(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<CalculatePayrollRequest>,
) -> Result<HttpResponse> {
    let period = PayrollPeriod::new(input.year, input.month)?;

    let payroll = state
        .payroll_service
        .calculate_for_user(input.user_id, period, user_context.profile())
        .await
        .map_err(|e| {
            log::error!(
                "Failed to calculate payroll for user {} in {}: {}",
                input.user_id,
                period,
                e
            );
            e
        })?;

    Ok(ApiResponse::success(payroll))
}

pub async fn bulk_calculate(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<BulkCalculateRequest>,
) -> Result<HttpResponse> {
    let input = input.into_inner();
    let period = PayrollPeriod::new(input.year, input.month)?;

    let result = state
        .payroll_service
        .bulk_calculate(input.user_ids, period, user_context.profile())
        .await?;

    Ok(ApiResponse::success(result))
}

pub async fn list_payrolls(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<PayrollFilter>,
) -> Result<HttpResponse> {
    let payrolls = state
        .payroll_service
        .list(query.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(payrolls))
}

pub async fn get_payroll(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let payroll = state
        .payroll_service
        .get(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn recalculate_payroll(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let payroll = state
        .payroll_service
        .recalculate(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn validate_payroll(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let validation = state
        .payroll_service
        .validate(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(validation))
}

pub async fn approve_payroll(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let payroll = state
        .payroll_service
        .approve(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn bulk_approve(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<BulkApproveRequest>,
) -> Result<HttpResponse> {
    let result = state
        .payroll_service
        .bulk_approve(input.into_inner().payroll_ids, user_context.profile())
        .await?;

    Ok(ApiResponse::success(result))
}

pub async fn mark_paid(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let payroll = state
        .payroll_service
        .mark_paid(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn cancel_payroll(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    input: web::Json<CancelPayrollRequest>,
) -> Result<HttpResponse> {
    let payroll = state
        .payroll_service
        .cancel(
            path.into_inner(),
            user_context.profile(),
            input.into_inner().reason,
        )
        .await?;

    Ok(ApiResponse::success(payroll))
}

pub async fn attendance_summary(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    if !user_context.profile().can_access_user_resource(user_id) {
        return Err(AppError::PermissionDenied(
            "You can only view your own attendance summary".to_string(),
        )
        .into());
    }

    let summary = state
        .payroll_service
        .attendance_summary(user_id, query.period()?)
        .await?;

    Ok(ApiResponse::success(summary))
}

pub async fn statistics(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let stats = state
        .payroll_service
        .statistics(query.period()?, user_context.profile())
        .await?;

    Ok(ApiResponse::success(stats))
}

pub async fn department_summary(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let summary = state
        .payroll_service
        .department_summary(query.period()?, user_context.profile())
        .await?;

    Ok(ApiResponse::success(summary))
}

pub async fn yearly_summary(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<YearQuery>,
) -> Result<HttpResponse> {
    let summary = state
        .payroll_service
        .yearly_summary(path.into_inner(), query.year, user_context.profile())
        .await?;

    Ok(ApiResponse::success(summary))
}

pub async fn top_earners(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<TopEarnersQuery>,
) -> Result<HttpResponse> {
    let period = PayrollPeriod::new(query.year, query.month)?;

    let earners = state
        .payroll_service
        .top_earners(
            period,
            query.limit.unwrap_or(DEFAULT_TOP_EARNERS),
            user_context.profile(),
        )
        .await?;

    Ok(ApiResponse::success(earners))
}

pub async fn compare_periods(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<PeriodQuery>,
) -> Result<HttpResponse> {
    let comparison = state
        .payroll_service
        .compare_periods(query.period()?, user_context.profile())
        .await?;

    Ok(ApiResponse::success(comparison))
}

pub async fn trends(
    user_context: UserContext,
    state: web::Data<AppState>,
    query: web::Query<TrendsQuery>,
) -> Result<HttpResponse> {
    let end = PayrollPeriod::new(query.year, query.month)?;

    let trends = state
        .payroll_service
        .trends(
            end,
            query.months.unwrap_or(DEFAULT_TREND_MONTHS),
            user_context.profile(),
        )
        .await?;

    Ok(ApiResponse::success(trends))
}
