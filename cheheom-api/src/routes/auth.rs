use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use validator::Validate;

use cheheom_shared::errors::{AppError, AppResult, ErrorCode};
use cheheom_shared::types::{
    ProfileResponse, SigninRequest, SigninResponse, SignupRequest, SignupResponse,
};

use crate::auth::{create_access_token, AuthUser};
use crate::services::user_service;
use crate::AppState;

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> AppResult<Json<SignupResponse>> {
    req.validate()?;

    let user = user_service::create(&state.store, req).await?;

    Ok(Json(SignupResponse {
        success: true,
        user,
        message: "회원가입이 완료되었습니다".into(),
    }))
}

pub async fn signin(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SigninRequest>,
) -> AppResult<Json<SigninResponse>> {
    req.validate()?;

    let user = user_service::authenticate(&state.store, &req.email, &req.password).await?;
    let access_token = create_access_token(
        user.user_id(),
        &user.email,
        user.user_type,
        &state.config.jwt_secret,
        state.config.jwt_access_ttl,
    )?;

    tracing::info!(user_id = %user.user_id(), "user signed in");

    Ok(Json(SigninResponse {
        success: true,
        user,
        access_token,
        message: "로그인 성공".into(),
    }))
}

pub async fn profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ProfileResponse>> {
    let stored = user_service::find_by_id(&state.store, &user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: stored.info,
    }))
}
