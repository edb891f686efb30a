use cheheom_shared::clients::kv::KvStore;
use cheheom_shared::errors::AppResult;
use cheheom_shared::types::FavoriteAction;

use super::keys;

/// Apply an add/remove and return the resulting favorite ids.
pub async fn update(
    store: &KvStore,
    user_id: &str,
    product_id: &str,
    action: FavoriteAction,
) -> AppResult<Vec<String>> {
    let key = keys::user_favorites(user_id);
    match action {
        FavoriteAction::Add => store.index_add(&key, product_id).await?,
        FavoriteAction::Remove => store.index_remove(&key, product_id).await?,
    };
    list(store, user_id).await
}

pub async fn list(store: &KvStore, user_id: &str) -> AppResult<Vec<String>> {
    Ok(store.index_members(&keys::user_favorites(user_id)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_is_idempotent_and_remove_deletes() {
        let store = KvStore::memory();
        update(&store, "u-1", "p1", FavoriteAction::Add).await.unwrap();
        update(&store, "u-1", "p2", FavoriteAction::Add).await.unwrap();
        let favorites = update(&store, "u-1", "p1", FavoriteAction::Add).await.unwrap();
        assert_eq!(favorites, vec!["p1", "p2"]);

        let favorites = update(&store, "u-1", "p1", FavoriteAction::Remove).await.unwrap();
        assert_eq!(favorites, vec!["p2"]);
        assert!(list(&store, "u-2").await.unwrap().is_empty());
    }
}
