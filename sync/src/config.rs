//! Sync service configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use govsync_types::Address;
use govsync_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::SyncError;

/// How long a cached state is served before the next request re-reads it.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15);

/// Configuration for a proposal-state sync service.
///
/// Can be loaded from a TOML file via [`SyncConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Cache TTL in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upper bound on one batched ledger read, in seconds.
    #[serde(default = "default_ledger_timeout_secs")]
    pub ledger_timeout_secs: u64,

    /// JSON-RPC endpoint of the chain hosting the Governor.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Block tag every `eth_call` reads at (`"latest"`, `"safe"`, `"finalized"`).
    #[serde(default = "default_block_tag")]
    pub block_tag: String,

    /// Governor contract address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governor_address: Option<Address>,

    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_lmdb_map_size_mb")]
    pub lmdb_map_size_mb: usize,

    /// Port the HTTP query surface listens on.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to expose Prometheus metrics on `/metrics`.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_ledger_timeout_secs() -> u64 {
    10
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_block_tag() -> String {
    "latest".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./govsync_data")
}

fn default_lmdb_map_size_mb() -> usize {
    256
}

fn default_rpc_port() -> u16 {
    7090
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl SyncConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, SyncError> {
        toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("SyncConfig is always serializable to TOML")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn ledger_timeout(&self) -> Duration {
        Duration::from_secs(self.ledger_timeout_secs)
    }

    pub fn lmdb_map_size(&self) -> usize {
        self.lmdb_map_size_mb.saturating_mul(1024 * 1024)
    }

    /// The Governor address, which has no sensible default.
    pub fn governor(&self) -> Result<Address, SyncError> {
        self.governor_address
            .ok_or_else(|| SyncError::Config("governor_address is not set".into()))
    }

    /// Reject settings that would make every pass fail.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.ledger_timeout_secs == 0 {
            return Err(SyncError::Config("ledger_timeout_secs must be > 0".into()));
        }
        if self.block_tag.trim().is_empty() {
            return Err(SyncError::Config("block_tag must not be empty".into()));
        }
        if self.lmdb_map_size_mb == 0 {
            return Err(SyncError::Config("lmdb_map_size_mb must be > 0".into()));
        }
        self.log_format
            .parse::<LogFormat>()
            .map_err(|e| SyncError::Config(e.to_string()))?;
        self.governor().map(|_| ())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            ledger_timeout_secs: default_ledger_timeout_secs(),
            rpc_url: default_rpc_url(),
            block_tag: default_block_tag(),
            governor_address: None,
            data_dir: default_data_dir(),
            lmdb_map_size_mb: default_lmdb_map_size_mb(),
            rpc_port: default_rpc_port(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
        }
    }
}
