//! Configuration types for gridiron.
//!
//! [`Config::load`] reads `~/.config/gridiron/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist, then applies `GRIDIRON__*`
//! environment overrides. [`Config::defaults`] returns the same defaults
//! without touching the filesystem (useful in tests).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::ResourceType;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[provider]
base_url             = "https://api.balldontlie.io/nfl/v1"
request_timeout_secs = 15
default_page_size    = 25
max_page_size        = 100

[retry]
max_attempts         = 4
initial_backoff_ms   = 500
max_backoff_ms       = 8000
multiplier           = 2.0
max_retry_after_secs = 60

[sync]
resources          = ["teams", "players", "games", "stats", "advanced_metrics"]
interval_secs      = 3600
failure_ceiling    = 50
failure_ratio      = 0.25
failure_min_sample = 20

[storage]
data_dir    = "gridiron-data"
ledger_file = "sync_status.json"
"#;

/// Environment variable consulted for the provider key when the config file
/// does not set one.
pub const API_KEY_ENV: &str = "BALLDONTLIE_API_KEY";

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[provider]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// Per-resource path overrides, keyed by resource name.
    #[serde(default)]
    pub paths: HashMap<String, String>,
}

fn default_base_url() -> String { "https://api.balldontlie.io/nfl/v1".to_string() }
fn default_request_timeout_secs() -> u64 { 15 }
fn default_page_size() -> u32 { 25 }
fn default_max_page_size() -> u32 { 100 }

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            paths: HashMap::new(),
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Path segment for `resource`, honouring overrides.
    pub fn path_for(&self, resource: ResourceType) -> &str {
        self.paths
            .get(resource.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| resource.default_path())
    }

    /// Configured key, falling back to [`API_KEY_ENV`].
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }
}

/// `[retry]` section — feed request retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_retry_after_secs")]
    pub max_retry_after_secs: u64,
}

fn default_max_attempts() -> u32 { 4 }
fn default_initial_backoff_ms() -> u64 { 500 }
fn default_max_backoff_ms() -> u64 { 8000 }
fn default_multiplier() -> f64 { 2.0 }
fn default_max_retry_after_secs() -> u64 { 60 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
            max_retry_after_secs: default_max_retry_after_secs(),
        }
    }
}

/// `[sync]` section — which resources to run and the failure budget.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_resources")]
    pub resources: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_failure_ceiling")]
    pub failure_ceiling: usize,
    #[serde(default = "default_failure_ratio")]
    pub failure_ratio: f64,
    #[serde(default = "default_failure_min_sample")]
    pub failure_min_sample: usize,
}

fn default_resources() -> Vec<String> {
    ResourceType::ALL.iter().map(|r| r.as_str().to_string()).collect()
}
fn default_interval_secs() -> u64 { 3600 }
fn default_failure_ceiling() -> usize { 50 }
fn default_failure_ratio() -> f64 { 0.25 }
fn default_failure_min_sample() -> usize { 20 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resources: default_resources(),
            interval_secs: default_interval_secs(),
            failure_ceiling: default_failure_ceiling(),
            failure_ratio: default_failure_ratio(),
            failure_min_sample: default_failure_min_sample(),
        }
    }
}

impl SyncConfig {
    /// Parsed resource list. Unknown names are an error rather than being
    /// silently dropped.
    pub fn resource_types(&self) -> anyhow::Result<Vec<ResourceType>> {
        self.resources
            .iter()
            .map(|name| name.parse::<ResourceType>().map_err(Into::into))
            .collect()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
}

fn default_data_dir() -> PathBuf { PathBuf::from("gridiron-data") }
fn default_ledger_file() -> String { "sync_status.json".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_file: default_ledger_file(),
        }
    }
}

impl StorageConfig {
    pub fn entities_dir(&self) -> PathBuf {
        self.data_dir.join("entities")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/gridiron/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::load_from(&path)
    }

    /// Load defaults + the file at `path` (which must exist) + environment.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("GRIDIRON")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("gridiron")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
