use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::errors::{AppError, AppResult, ErrorCode};
use cheheom_shared::types::Notification;

use super::keys;

/// Deliver a notification into `target_user_id`'s inbox.
pub async fn create(store: &KvStore, target_user_id: &str, notification: Notification) -> AppResult<Notification> {
    if notification.id.trim().is_empty() || target_user_id.trim().is_empty() {
        return Err(AppError::Validation("id and targetUserId are required".into()));
    }

    store.set_json(&keys::notification(&notification.id), &notification).await?;
    store
        .index_add(&keys::user_notifications(target_user_id), &notification.id)
        .await?;

    tracing::info!(
        notification_id = %notification.id,
        target_user_id = %target_user_id,
        "notification delivered"
    );
    Ok(notification)
}

pub async fn list(store: &KvStore, user_id: &str) -> AppResult<Vec<Notification>> {
    Ok(store
        .load_indexed(&keys::user_notifications(user_id), keys::NOTIFICATION)
        .await?)
}

pub async fn mark_read(store: &KvStore, user_id: &str, id: &str) -> AppResult<Notification> {
    let not_found = || AppError::new(ErrorCode::NotificationNotFound, "notification not found");

    let inbox = store.index_members(&keys::user_notifications(user_id)).await?;
    if !inbox.iter().any(|member| member == id) {
        return Err(not_found());
    }

    let mut notification: Notification = store
        .get_json(&keys::notification(id))
        .await?
        .ok_or_else(not_found)?;
    notification.read = true;
    store.set_json(&keys::notification(id), &notification).await?;
    Ok(notification)
}
