use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use cheheom_shared::errors::AppResult;
use cheheom_shared::types::{FavoriteRequest, FavoritesResponse};

use crate::auth::AuthUser;
use crate::services::favorite_service;
use crate::AppState;

pub async fn update_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<FavoriteRequest>,
) -> AppResult<Json<FavoritesResponse>> {
    let favorites = favorite_service::update(&state.store, &user.id, &req.product_id, req.action).await?;
    Ok(Json(FavoritesResponse { success: true, favorites }))
}

pub async fn list_favorites(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<FavoritesResponse>> {
    let favorites = favorite_service::list(&state.store, &user.id).await?;
    Ok(Json(FavoritesResponse { success: true, favorites }))
}
