use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Prefix every route is mounted under, e.g. `/api`.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Also answer on the doubled `{base}{base}` prefix older clients call.
    #[serde(default)]
    pub serve_legacy_prefix: bool,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_ttl")]
    pub jwt_access_ttl: i64,
    #[serde(default = "default_store_backend")]
    pub store_backend: StoreBackend,
    #[serde(default = "default_redis")]
    pub redis_url: String,
}

fn default_port() -> u16 { 3010 }
fn default_base_path() -> String { "/api".into() }
fn default_jwt_secret() -> String { "development-secret-change-in-production".into() }
fn default_access_ttl() -> i64 { 3600 }
fn default_store_backend() -> StoreBackend { StoreBackend::Memory }
fn default_redis() -> String { "redis://localhost:6379".into() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            base_path: default_base_path(),
            serve_legacy_prefix: false,
            jwt_secret: default_jwt_secret(),
            jwt_access_ttl: default_access_ttl(),
            store_backend: default_store_backend(),
            redis_url: default_redis(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CHEHEOM_API").separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Base path without a trailing slash; empty when routes live at the root.
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_end_matches('/');
        if trimmed.is_empty() || trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}
