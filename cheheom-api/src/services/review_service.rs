use cheheom_shared::clients::kv::KvStore;
use chrono::Utc;

use cheheom_shared::errors::{AppError, AppResult, ErrorCode};
use cheheom_shared::types::{Review, UpdateReviewRequest};

use super::{keys, product_service};

pub async fn create(store: &KvStore, user_id: &str, mut review: Review) -> AppResult<Review> {
    if review.id.trim().is_empty() || review.product_id.trim().is_empty() {
        return Err(AppError::Validation("id and productId are required".into()));
    }

    if let Some(existing) = store.get_json::<Review>(&keys::review(&review.id)).await? {
        if existing.user_id.as_deref() != Some(user_id) {
            return Err(AppError::forbidden("review belongs to another account"));
        }
        return Ok(existing);
    }

    review.user_id = Some(user_id.to_string());
    store.set_json(&keys::review(&review.id), &review).await?;
    store.index_add(&keys::user_reviews(user_id), &review.id).await?;
    store.index_add(&keys::product_reviews(&review.product_id), &review.id).await?;

    tracing::info!(review_id = %review.id, product_id = %review.product_id, "review created");
    Ok(review)
}

pub async fn list_for_user(store: &KvStore, user_id: &str) -> AppResult<Vec<Review>> {
    Ok(store.load_indexed(&keys::user_reviews(user_id), keys::REVIEW).await?)
}

/// Reviews written about any of the owner's products.
pub async fn list_for_business(store: &KvStore, owner_id: &str) -> AppResult<Vec<Review>> {
    let mut out = Vec::new();
    for product_id in store.index_members(&keys::user_products(owner_id)).await? {
        let reviews: Vec<Review> = store
            .load_indexed(&keys::product_reviews(&product_id), keys::REVIEW)
            .await?;
        out.extend(reviews);
    }
    Ok(out)
}

/// Hide, publish or report a review of one of the owner's products.
pub async fn moderate(store: &KvStore, owner_id: &str, id: &str, req: UpdateReviewRequest) -> AppResult<Review> {
    let mut review = store
        .get_json::<Review>(&keys::review(id))
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound, format!("review {id} not found")))?;
    product_service::get_owned(store, &review.product_id, owner_id).await?;

    if let Some(status) = req.status {
        review.status = status;
    }
    if let Some(reason) = req.report_reason {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("reportReason must not be blank".into()));
        }
        review.reported = true;
        review.report_reason = Some(reason.to_string());
        review.reported_at = Some(Utc::now());
    }

    store.set_json(&keys::review(id), &review).await?;
    tracing::info!(review_id = %id, status = ?review.status, reported = review.reported, "review moderated");
    Ok(review)
}
