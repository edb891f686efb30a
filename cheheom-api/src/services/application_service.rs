use chrono::Utc;

use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::errors::{AppError, AppResult, ErrorCode};
use cheheom_shared::types::{Application, ApplicationStatus};

use super::{keys, product_service};

/// Store a reviewer's application. Re-sending an already stored id is a no-op.
pub async fn create(store: &KvStore, user_id: &str, mut application: Application) -> AppResult<Application> {
    if application.id.trim().is_empty() || application.product_id.trim().is_empty() {
        return Err(AppError::Validation("id and productId are required".into()));
    }

    if let Some(existing) = store.get_json::<Application>(&keys::application(&application.id)).await? {
        if existing.user_id != user_id {
            return Err(AppError::forbidden("application belongs to another account"));
        }
        return Ok(existing);
    }

    let mine = list_for_user(store, user_id).await?;
    if mine.iter().any(|a| a.product_id == application.product_id) {
        return Err(AppError::new(ErrorCode::AlreadyApplied, "already applied to this product"));
    }

    application.user_id = user_id.to_string();
    application.status = ApplicationStatus::Pending;
    application.reviewed_at = None;

    store.set_json(&keys::application(&application.id), &application).await?;
    store.index_add(&keys::user_applications(user_id), &application.id).await?;
    store
        .index_add(&keys::product_applications(&application.product_id), &application.id)
        .await?;

    tracing::info!(
        application_id = %application.id,
        product_id = %application.product_id,
        user_id = %user_id,
        "application created"
    );
    Ok(application)
}

pub async fn list_for_user(store: &KvStore, user_id: &str) -> AppResult<Vec<Application>> {
    Ok(store
        .load_indexed(&keys::user_applications(user_id), keys::APPLICATION)
        .await?)
}

/// Applications to the owner's products, optionally narrowed to one product.
pub async fn list_for_business(
    store: &KvStore,
    owner_id: &str,
    product_id: Option<&str>,
) -> AppResult<Vec<Application>> {
    let product_ids = match product_id {
        Some(id) => {
            product_service::get_owned(store, id, owner_id).await?;
            vec![id.to_string()]
        }
        None => store.index_members(&keys::user_products(owner_id)).await?,
    };

    let mut out = Vec::new();
    for id in product_ids {
        let applications: Vec<Application> = store
            .load_indexed(&keys::product_applications(&id), keys::APPLICATION)
            .await?;
        out.extend(applications);
    }
    Ok(out)
}

async fn get(store: &KvStore, id: &str) -> AppResult<Application> {
    store
        .get_json(&keys::application(id))
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ApplicationNotFound, "application not found"))
}

/// Select or reject an applicant. Only the owner of the product may decide.
pub async fn update_status(
    store: &KvStore,
    owner_id: &str,
    id: &str,
    status: ApplicationStatus,
) -> AppResult<Application> {
    let mut application = get(store, id).await?;
    product_service::get_owned(store, &application.product_id, owner_id).await?;

    application.status = status;
    application.reviewed_at = Some(Utc::now());
    store.set_json(&keys::application(id), &application).await?;

    tracing::info!(application_id = %id, status = %status, "application status updated");
    Ok(application)
}

/// Withdraw a pending application.
pub async fn delete(store: &KvStore, user_id: &str, id: &str) -> AppResult<()> {
    let application = get(store, id).await?;
    if application.user_id != user_id {
        return Err(AppError::forbidden("application belongs to another account"));
    }
    if application.status != ApplicationStatus::Pending {
        return Err(AppError::new(
            ErrorCode::ApplicationNotPending,
            "only pending applications can be cancelled",
        ));
    }

    store.del(&keys::application(id)).await?;
    store.index_remove(&keys::user_applications(user_id), id).await?;
    store
        .index_remove(&keys::product_applications(&application.product_id), id)
        .await?;

    tracing::info!(application_id = %id, user_id = %user_id, "application cancelled");
    Ok(())
}
