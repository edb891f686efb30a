use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;

use cheheom_shared::errors::AppResult;
use cheheom_shared::types::{CreateNotificationRequest, NotificationResponse, NotificationsResponse};

use crate::auth::AuthUser;
use crate::services::notification_service;
use crate::AppState;

pub async fn create_notification(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNotificationRequest>,
) -> AppResult<Json<NotificationResponse>> {
    let notification =
        notification_service::create(&state.store, &req.target_user_id, req.notification).await?;
    Ok(Json(NotificationResponse { success: true, notification }))
}

pub async fn list_notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = notification_service::list(&state.store, &user.id).await?;
    Ok(Json(NotificationsResponse { success: true, notifications }))
}

pub async fn mark_notification_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<NotificationResponse>> {
    let notification = notification_service::mark_read(&state.store, &user.id, &id).await?;
    Ok(Json(NotificationResponse { success: true, notification }))
}
