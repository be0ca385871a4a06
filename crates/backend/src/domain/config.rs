//! Configuration for phishguard.
//!
//! Config priority: `$CONFIG_DIR/config.toml` > `$XDG_CONFIG_HOME/phishguard/config.toml` >
//! platform config dir. Missing or unparseable files fall back to defaults.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::resource::{self, ResourceDescriptor, ResourceType};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("No resource registered for {resource_type} at index {index}")]
  UnknownResource { resource_type: ResourceType, index: usize },
  #[error("Invalid config file: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

// ============================================================================
// Sync Configuration
// ============================================================================

/// List synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Which list to mirror: "domains" or "links"
  pub resource: ResourceType,

  /// Index into the registry for the resource type (default: 0)
  pub resource_index: usize,

  /// Periodic tick interval and incremental-update freshness window
  /// Default: 86400 (24 hours)
  pub update_interval_secs: u64,

  /// Triggers arriving sooner than this after the last check are dropped
  /// Default: 300 (5 minutes)
  pub min_recheck_secs: u64,

  /// Delay between failed attempts within one cycle
  /// Default: 300 (5 minutes)
  pub retry_delay_secs: u64,

  /// Attempts per triggered cycle, including the first
  /// Default: 3
  pub max_attempts: u32,

  /// Entries per store write / working-set build chunk
  /// Default: 50000
  pub chunk_size: usize,

  /// Stream the full list into the store instead of buffering it
  /// Default: true
  pub stream_full_list: bool,

  /// Optional HTTP request timeout (none = network layer default)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub request_timeout_secs: Option<u64>,

  /// Endpoint overrides for mirrors
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub checksum_url: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub delta_url: Option<String>,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      resource: ResourceType::Domains,
      resource_index: 0,
      update_interval_secs: 24 * 3600,
      min_recheck_secs: 300,
      retry_delay_secs: 300,
      max_attempts: 3,
      chunk_size: 50_000,
      stream_full_list: true,
      request_timeout_secs: None,
      full_url: None,
      checksum_url: None,
      delta_url: None,
    }
  }
}

impl SyncConfig {
  pub fn update_interval(&self) -> Duration {
    Duration::from_secs(self.update_interval_secs)
  }

  pub fn min_recheck(&self) -> Duration {
    Duration::from_secs(self.min_recheck_secs)
  }

  pub fn retry_delay(&self) -> Duration {
    Duration::from_secs(self.retry_delay_secs)
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }

  /// Resolve the configured resource against the registry.
  ///
  /// A missing descriptor is a configuration error, not something to retry.
  pub fn descriptor(&self) -> Result<ResourceDescriptor, ConfigError> {
    let descriptor =
      resource::lookup(self.resource, self.resource_index).ok_or(ConfigError::UnknownResource {
        resource_type: self.resource,
        index: self.resource_index,
      })?;

    Ok(descriptor.with_overrides(
      self.full_url.as_deref(),
      self.checksum_url.as_deref(),
      self.delta_url.as_deref(),
    ))
  }
}

// ============================================================================
// Lookup Configuration
// ============================================================================

/// How `is_phishing` resolves a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
  /// Working-set cache with matcher semantics
  #[default]
  Cached,
  /// Direct store point lookup on the normalized URL, no cache
  Exact,
  /// Short-circuit store scan with the matcher, no cache
  Scan,
}

/// Query path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
  pub mode: LookupMode,

  /// Entries always present in the working set (used to verify detection end to end)
  pub sentinels: Vec<String>,
}

impl Default for LookupConfig {
  fn default() -> Self {
    Self {
      mode: LookupMode::Cached,
      sentinels: vec!["phishing.testcategory.com".to_string()],
    }
  }
}

// ============================================================================
// Daemon Configuration
// ============================================================================

/// Daemon lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "info"
  #[serde(default = "default_log_level")]
  pub log_level: String,

  /// Log file rotation: "daily", "hourly", "never"
  /// Default: "daily"
  #[serde(default = "default_log_rotation")]
  pub log_rotation: String,

  /// Maximum log file age in days (0 = keep forever)
  /// Default: 7
  #[serde(default = "default_log_retention_days")]
  pub log_retention_days: u64,
}

fn default_log_level() -> String {
  "info".to_string()
}
fn default_log_rotation() -> String {
  "daily".to_string()
}
fn default_log_retention_days() -> u64 {
  7
}

impl Default for DaemonConfig {
  fn default() -> Self {
    Self {
      log_level: default_log_level(),
      log_rotation: default_log_rotation(),
      log_retention_days: default_log_retention_days(),
    }
  }
}

// ============================================================================
// Top-level
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
  /// List synchronization settings
  #[serde(default)]
  pub sync: SyncConfig,

  /// Query path settings
  #[serde(default)]
  pub lookup: LookupConfig,

  /// Daemon lifecycle settings
  #[serde(default)]
  pub daemon: DaemonConfig,
}

impl Config {
  /// Load the user config, falling back to defaults
  pub async fn load_global() -> Self {
    let Some(path) = Self::user_config_path() else {
      return Self::default();
    };

    match tokio::fs::read_to_string(&path).await {
      Ok(content) => match Self::parse(&content) {
        Ok(config) => {
          debug!(path = %path.display(), "Loaded config");
          config
        }
        Err(e) => {
          warn!(path = %path.display(), err = %e, "Invalid config, using defaults");
          Self::default()
        }
      },
      Err(_) => Self::default(),
    }
  }

  pub fn parse(content: &str) -> Result<Self, ConfigError> {
    Ok(toml::from_str(content)?)
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CONFIG_DIR") {
      return Some(PathBuf::from(path).join("config.toml"));
    }

    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
      return Some(PathBuf::from(path).join("phishguard").join("config.toml"));
    }

    dirs::config_dir().map(|p: PathBuf| p.join("phishguard").join("config.toml"))
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    r#"# phishguard configuration

[sync]
# Which list to mirror: "domains" or "links"
resource = "domains"

# Periodic check interval in seconds; also the window in which a changed
# checksum is applied as an incremental (append-only) update (default: 86400)
update_interval_secs = 86400

# Drop triggers arriving sooner than this after the last check (default: 300)
min_recheck_secs = 300

# Failed cycles are retried after this delay, up to max_attempts in total
retry_delay_secs = 300
max_attempts = 3

# Entries per store write chunk (default: 50000)
chunk_size = 50000

# Stream the full list into the store instead of buffering it (default: true)
stream_full_list = true

# Mirror overrides
# full_url = "https://example.com/phishing-domains-ACTIVE.txt"
# checksum_url = "https://example.com/phishing-domains-ACTIVE.txt.md5"
# delta_url = "https://example.com/phishing-domains-NEW-today.txt"

[lookup]
# "cached" (in-memory working set), "exact" (store point lookup), "scan" (store scan)
mode = "cached"
sentinels = ["phishing.testcategory.com"]

[daemon]
# Log level: "off", "error", "warn", "info", "debug", "trace"
log_level = "info"

# Log file rotation: "daily", "hourly", "never"
log_rotation = "daily"

# Maximum log file age in days (0 = keep forever)
log_retention_days = 7
"#
    .to_string()
  }
}
