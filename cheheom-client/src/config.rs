use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Primary API root, e.g. `https://example.com/functions/v1/server`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Appended to `base_url` for the single retry; empty disables the retry.
    #[serde(default = "default_legacy_prefix")]
    pub legacy_prefix: String,
    /// Public key sent as the bearer when no session token exists.
    #[serde(default)]
    pub anon_key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Directory for the file-backed local store; in-memory when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_base_url() -> String { "http://localhost:3010/api".into() }
fn default_legacy_prefix() -> String { "/api".into() }
fn default_timeout_ms() -> u64 { 15_000 }

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            legacy_prefix: default_legacy_prefix(),
            anon_key: String::new(),
            timeout_ms: default_timeout_ms(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("CHEHEOM_CLIENT").separator("__"))
            .build()?;
        config.try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
