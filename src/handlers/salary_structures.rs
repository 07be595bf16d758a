use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::AppState;
use crate::database::models::SalaryStructureInput;
use crate::handlers::shared::{ApiResponse, DateQuery};
use crate::services::UserContext;

pub async fn create_structure(
    user_context: UserContext,
    state: web::Data<AppState>,
    input: web::Json<SalaryStructureInput>,
) -> Result<HttpResponse> {
    let structure = state
        .salary_structure_service
        .create(input.into_inner(), user_context.profile())
        .await
        .map_err(|e| {
            log::error!("Failed to create salary structure: {}", e);
            e
        })?;

    Ok(ApiResponse::created(structure))
}

pub async fn get_structure(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let structure = state
        .salary_structure_service
        .get(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(structure))
}

pub async fn list_user_structures(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let structures = state
        .salary_structure_service
        .list_for_user(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(structures))
}

pub async fn active_structure(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<DateQuery>,
) -> Result<HttpResponse> {
    let structure = state
        .salary_structure_service
        .active_for(
            path.into_inner(),
            query.date_or_today(),
            user_context.profile(),
        )
        .await?;

    Ok(ApiResponse::success(structure))
}

pub async fn deactivate_structure(
    user_context: UserContext,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let structure = state
        .salary_structure_service
        .deactivate(path.into_inner(), user_context.profile())
        .await?;

    Ok(ApiResponse::success(structure))
}
