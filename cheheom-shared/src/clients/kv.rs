//! Generic key-value persistence.
//!
//! Values are JSON documents stored under string keys. Ordered id indexes
//! (`user:{id}:applications` and friends) are kept as separate sets: adding
//! or removing one member is a single atomic operation on both backends.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use super::redis::RedisClient;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Clone)]
pub enum KvStore {
    Memory(MemoryKv),
    Redis(RedisClient),
}

impl KvStore {
    pub fn memory() -> Self {
        Self::Memory(MemoryKv::default())
    }

    pub async fn redis(url: &str) -> Result<Self, StoreError> {
        Ok(Self::Redis(RedisClient::connect(url).await?))
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Memory(m) => Ok(m.values.read().await.get(key).cloned()),
            Self::Redis(r) => Ok(r.get(key).await?),
        }
    }

    async fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            Self::Memory(m) => {
                m.values.write().await.insert(key.to_string(), value);
                Ok(())
            }
            Self::Redis(r) => Ok(r.set(key, &value).await?),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, raw).await
    }

    pub async fn del(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(m) => {
                m.values.write().await.remove(key);
                Ok(())
            }
            Self::Redis(r) => Ok(r.del(key).await?),
        }
    }

    /// Fetch several documents at once. Missing keys are skipped; order follows `keys`.
    pub async fn get_many_json<T: DeserializeOwned>(&self, keys: &[String]) -> Result<Vec<T>, StoreError> {
        let raws = match self {
            Self::Memory(m) => {
                let values = m.values.read().await;
                keys.iter().map(|k| values.get(k).cloned()).collect::<Vec<_>>()
            }
            Self::Redis(r) => r.mget(keys).await?,
        };

        let mut out = Vec::with_capacity(raws.len());
        for raw in raws.into_iter().flatten() {
            out.push(serde_json::from_str(&raw)?);
        }
        Ok(out)
    }

    /// Add a member to an ordered index. Returns false if it was already present.
    pub async fn index_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(m) => {
                let mut indexes = m.indexes.write().await;
                let entry = indexes.entry(key.to_string()).or_default();
                if entry.iter().any(|existing| existing == member) {
                    return Ok(false);
                }
                entry.push(member.to_string());
                Ok(true)
            }
            Self::Redis(r) => {
                let score = chrono::Utc::now().timestamp_micros() as f64;
                Ok(r.zadd_nx(key, member, score).await?)
            }
        }
    }

    pub async fn index_remove(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(m) => {
                let mut indexes = m.indexes.write().await;
                let Some(entry) = indexes.get_mut(key) else {
                    return Ok(false);
                };
                let before = entry.len();
                entry.retain(|existing| existing != member);
                Ok(entry.len() != before)
            }
            Self::Redis(r) => Ok(r.zrem(key, member).await?),
        }
    }

    /// Members of an index in insertion order.
    pub async fn index_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Memory(m) => Ok(m.indexes.read().await.get(key).cloned().unwrap_or_default()),
            Self::Redis(r) => Ok(r.zrange_all(key).await?),
        }
    }

    /// Load every document referenced by an index, where documents live at `{prefix}:{member}`.
    pub async fn load_indexed<T: DeserializeOwned>(
        &self,
        index_key: &str,
        prefix: &str,
    ) -> Result<Vec<T>, StoreError> {
        let keys: Vec<String> = self
            .index_members(index_key)
            .await?
            .into_iter()
            .map(|id| format!("{prefix}:{id}"))
            .collect();
        self.get_many_json(&keys).await
    }
}

/// Process-local store for development and tests.
#[derive(Clone, Default)]
pub struct MemoryKv {
    values: Arc<RwLock<HashMap<String, String>>>,
    indexes: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
    }

    #[tokio::test]
    async fn json_round_trip_and_delete() {
        let store = KvStore::memory();
        store.set_json("doc:1", &Doc { name: "a".into() }).await.unwrap();

        let loaded: Option<Doc> = store.get_json("doc:1").await.unwrap();
        assert_eq!(loaded, Some(Doc { name: "a".into() }));

        store.del("doc:1").await.unwrap();
        let gone: Option<Doc> = store.get_json("doc:1").await.unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn index_keeps_insertion_order_and_uniqueness() {
        let store = KvStore::memory();
        assert!(store.index_add("idx", "b").await.unwrap());
        assert!(store.index_add("idx", "a").await.unwrap());
        assert!(!store.index_add("idx", "b").await.unwrap());
        assert_eq!(store.index_members("idx").await.unwrap(), vec!["b", "a"]);

        assert!(store.index_remove("idx", "b").await.unwrap());
        assert!(!store.index_remove("idx", "b").await.unwrap());
        assert_eq!(store.index_members("idx").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn load_indexed_skips_dangling_members() {
        let store = KvStore::memory();
        store.set_json("doc:1", &Doc { name: "one".into() }).await.unwrap();
        store.index_add("docs", "1").await.unwrap();
        store.index_add("docs", "2").await.unwrap();

        let docs: Vec<Doc> = store.load_indexed("docs", "doc").await.unwrap();
        assert_eq!(docs, vec![Doc { name: "one".into() }]);
    }
}
