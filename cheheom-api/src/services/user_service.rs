use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::errors::{AppError, AppResult, ErrorCode};
use cheheom_shared::types::{SignupRequest, UserInfo};

use super::{auth_service, keys};

/// A user record as persisted. `user:id:{id}` holds only the email it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    #[serde(flatten)]
    pub info: UserInfo,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

pub async fn create(store: &KvStore, req: SignupRequest) -> AppResult<UserInfo> {
    let email = req.email.trim().to_lowercase();
    let user_type = req
        .user_type
        .ok_or_else(|| AppError::Validation("userType is required".into()))?;

    auth_service::validate_password(&req.password)?;

    if store.get_json::<StoredUser>(&keys::user_by_email(&email)).await?.is_some() {
        return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
    }

    let id = Uuid::now_v7().to_string();
    let user = StoredUser {
        info: UserInfo {
            id: Some(id.clone()),
            name: req.name,
            email: email.clone(),
            phone: req.phone,
            user_type,
            business_name: req.business_name,
            business_number: req.business_number,
            business_address: req.business_address,
        },
        password_hash: auth_service::hash_password(&req.password)?,
        created_at: Utc::now(),
    };

    store.set_json(&keys::user_by_email(&email), &user).await?;
    store.set_json(&keys::user_by_id(&id), &email).await?;

    tracing::info!(user_id = %id, user_type = %user_type, "user registered");
    Ok(user.info)
}

pub async fn find_by_email(store: &KvStore, email: &str) -> AppResult<Option<StoredUser>> {
    let email = email.trim().to_lowercase();
    Ok(store.get_json(&keys::user_by_email(&email)).await?)
}

pub async fn find_by_id(store: &KvStore, id: &str) -> AppResult<Option<StoredUser>> {
    let Some(email) = store.get_json::<String>(&keys::user_by_id(id)).await? else {
        return Ok(None);
    };
    find_by_email(store, &email).await
}

/// Check credentials; unknown email and wrong password are indistinguishable to the caller.
pub async fn authenticate(store: &KvStore, email: &str, password: &str) -> AppResult<UserInfo> {
    let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");

    let user = find_by_email(store, email).await?.ok_or_else(invalid)?;
    if !auth_service::verify_password(password, &user.password_hash)? {
        return Err(invalid());
    }
    Ok(user.info)
}
