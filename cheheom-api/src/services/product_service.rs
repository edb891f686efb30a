use chrono::Utc;
use uuid::Uuid;

use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::errors::{AppError, AppResult, ErrorCode};
use cheheom_shared::types::{Application, ApplicationStatus, Product};

use super::keys;

pub async fn create(store: &KvStore, owner_id: &str, mut product: Product) -> AppResult<Product> {
    if product.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if product.id.trim().is_empty() {
        product.id = Uuid::now_v7().to_string();
    }

    if let Some(existing) = store.get_json::<Product>(&keys::product(&product.id)).await? {
        if existing.owner_id.as_deref() != Some(owner_id) {
            return Err(AppError::new(ErrorCode::NotProductOwner, "product belongs to another account"));
        }
    }

    product.owner_id = Some(owner_id.to_string());
    product.created_at.get_or_insert_with(Utc::now);

    store.set_json(&keys::product(&product.id), &product).await?;
    store.index_add(&keys::user_products(owner_id), &product.id).await?;

    tracing::info!(product_id = %product.id, owner_id = %owner_id, "product created");
    with_counters(store, product).await
}

pub async fn get(store: &KvStore, id: &str) -> AppResult<Product> {
    let product = store
        .get_json::<Product>(&keys::product(id))
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound, "product not found"))?;
    with_counters(store, product).await
}

/// Fetch a product and make sure `owner_id` owns it.
pub async fn get_owned(store: &KvStore, id: &str, owner_id: &str) -> AppResult<Product> {
    let product = get(store, id).await?;
    if product.owner_id.as_deref() != Some(owner_id) {
        return Err(AppError::new(ErrorCode::NotProductOwner, "product belongs to another account"));
    }
    Ok(product)
}

pub async fn list_for_owner(store: &KvStore, owner_id: &str) -> AppResult<Vec<Product>> {
    let products: Vec<Product> = store
        .load_indexed(&keys::user_products(owner_id), keys::PRODUCT)
        .await?;

    let mut out = Vec::with_capacity(products.len());
    for product in products {
        out.push(with_counters(store, product).await?);
    }
    Ok(out)
}

/// Replace the stored counters with values derived from the application and review indexes.
pub async fn with_counters(store: &KvStore, mut product: Product) -> AppResult<Product> {
    let applications: Vec<Application> = store
        .load_indexed(&keys::product_applications(&product.id), keys::APPLICATION)
        .await?;
    let reviews = store.index_members(&keys::product_reviews(&product.id)).await?;

    product.current_applicants = applications
        .iter()
        .filter(|a| a.status != ApplicationStatus::Rejected)
        .count() as u32;
    product.review_count = reviews.len() as u32;
    Ok(product)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_product(id: &str) -> Product {
        Product {
            id: id.into(),
            name: "할머니 손맛 김치찌개".into(),
            seller: "동네식당".into(),
            category: "한식".into(),
            location: "서울시 마포구".into(),
            latitude: None,
            longitude: None,
            image: "https://example.com/a.jpg".into(),
            review_count: 7,
            description: "집밥 같은 김치찌개".into(),
            application_deadline: "12.20(금) - 12.25(수)".into(),
            required_reviewers: 10,
            current_applicants: 99,
            like_count: 3,
            distance: "1.2km".into(),
            badge: None,
            owner_id: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_owner_and_derives_counters() {
        let store = KvStore::memory();
        let product = create(&store, "biz-1", sample_product("p1")).await.unwrap();

        assert_eq!(product.owner_id.as_deref(), Some("biz-1"));
        assert!(product.created_at.is_some());
        assert_eq!(product.current_applicants, 0);
        assert_eq!(product.review_count, 0);
        assert_eq!(product.like_count, 3);

        let listed = list_for_owner(&store, "biz-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(list_for_owner(&store, "biz-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_id_gets_generated() {
        let store = KvStore::memory();
        let product = create(&store, "biz-1", sample_product("")).await.unwrap();
        assert!(!product.id.is_empty());
        assert!(get(&store, &product.id).await.is_ok());
    }

    #[tokio::test]
    async fn another_owner_cannot_overwrite() {
        let store = KvStore::memory();
        create(&store, "biz-1", sample_product("p1")).await.unwrap();
        let err = create(&store, "biz-2", sample_product("p1")).await.unwrap_err();
        assert!(matches!(err, AppError::Known { code: ErrorCode::NotProductOwner, .. }));
        assert!(get_owned(&store, "p1", "biz-2").await.is_err());
    }
}
