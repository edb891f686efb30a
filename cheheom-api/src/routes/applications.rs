use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;

use cheheom_shared::errors::AppResult;
use cheheom_shared::types::{
    Application, ApplicationResponse, ApplicationsResponse, BusinessApplicationsQuery,
    SuccessResponse, UpdateApplicationRequest,
};

use crate::auth::AuthUser;
use crate::services::application_service;
use crate::AppState;

pub async fn create_application(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(application): Json<Application>,
) -> AppResult<Json<ApplicationResponse>> {
    let application = application_service::create(&state.store, &user.id, application).await?;
    Ok(Json(ApplicationResponse { success: true, application }))
}

pub async fn list_applications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApplicationsResponse>> {
    let applications = application_service::list_for_user(&state.store, &user.id).await?;
    Ok(Json(ApplicationsResponse { success: true, applications }))
}

pub async fn list_business_applications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<BusinessApplicationsQuery>,
) -> AppResult<Json<ApplicationsResponse>> {
    let applications =
        application_service::list_for_business(&state.store, &user.id, query.product_id.as_deref()).await?;
    Ok(Json(ApplicationsResponse { success: true, applications }))
}

pub async fn update_application(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateApplicationRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    let application = application_service::update_status(&state.store, &user.id, &id, req.status).await?;
    Ok(Json(ApplicationResponse { success: true, application }))
}

pub async fn delete_application(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<SuccessResponse>> {
    application_service::delete(&state.store, &user.id, &id).await?;
    Ok(Json(SuccessResponse::ok()))
}
