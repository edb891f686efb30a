use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use cheheom_shared::errors::AppResult;
use cheheom_shared::types::{Review, ReviewResponse, ReviewsResponse, UpdateReviewRequest, UserType};

use crate::auth::AuthUser;
use crate::services::review_service;
use crate::AppState;

pub async fn create_review(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(review): Json<Review>,
) -> AppResult<Json<ReviewResponse>> {
    let review = review_service::create(&state.store, &user.id, review).await?;
    Ok(Json(ReviewResponse { success: true, review }))
}

/// Reviewers get their own reviews; business accounts get reviews of their products.
pub async fn list_reviews(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ReviewsResponse>> {
    let reviews = match user.user_type {
        UserType::Reviewer => review_service::list_for_user(&state.store, &user.id).await?,
        UserType::Business => review_service::list_for_business(&state.store, &user.id).await?,
    };
    Ok(Json(ReviewsResponse { success: true, reviews }))
}

pub async fn update_review(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateReviewRequest>,
) -> AppResult<Json<ReviewResponse>> {
    let review = review_service::moderate(&state.store, &user.id, &id, req).await?;
    Ok(Json(ReviewResponse { success: true, review }))
}
