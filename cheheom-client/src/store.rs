//! Durable client-side storage of named collections.
//!
//! Reads never fail: an absent or unreadable entry yields the collection's
//! default. Writes are best-effort and only logged on failure.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Every entry the client persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    AccessToken,
    Applications,
    Favorites,
    ProductLikes,
    BusinessProducts,
    CompletedReviews,
    Notifications,
    PointTransactions,
    UserPoints,
    UserLevel,
    Tombstones,
    Outbox,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::AccessToken => "accessToken",
            StoreKey::Applications => "applications",
            StoreKey::Favorites => "favorites",
            StoreKey::ProductLikes => "productLikes",
            StoreKey::BusinessProducts => "businessProducts",
            StoreKey::CompletedReviews => "completedReviews",
            StoreKey::Notifications => "notifications",
            StoreKey::PointTransactions => "pointTransactions",
            StoreKey::UserPoints => "userPoints",
            StoreKey::UserLevel => "userLevel",
            StoreKey::Tombstones => "tombstones",
            StoreKey::Outbox => "outbox",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> io::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> io::Result<()>;
    fn delete(&self, key: &str) -> io::Result<()>;
}

/// One `{key}.json` file per entry under a directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        // Write-then-rename so a crash never leaves a half-written entry.
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(key))
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[derive(Clone)]
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    pub fn load<T: DeserializeOwned + Default>(&self, key: StoreKey) -> T {
        let raw = match self.backend.read(key.as_str()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "local store read failed");
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(key = %key, error = %e, "discarding corrupt local entry");
            T::default()
        })
    }

    pub fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "local store serialization failed");
                return;
            }
        };
        if let Err(e) = self.backend.write(key.as_str(), &raw) {
            tracing::warn!(key = %key, error = %e, "local store write failed");
        }
    }

    pub fn remove(&self, key: StoreKey) {
        if let Err(e) = self.backend.delete(key.as_str()) {
            tracing::warn!(key = %key, error = %e, "local store delete failed");
        }
    }
}
