pub mod catalog;
pub mod config;
pub mod error;
pub mod levels;
pub mod outbox;
pub mod points;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod stats;
pub mod store;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, SyncError};
pub use session::{ReviewDraft, Session, SessionEvent};
pub use store::{FileStorage, LocalStore, MemoryStorage, StorageBackend, StoreKey};
