//! Configuration loading for huginnd.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.huginn/config.toml` (user)
//! 3. `/etc/huginn/config.toml` (system)
//!
//! When no file exists at the standard locations every section falls back to
//! its defaults. An explicit path that does not exist is an error.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::cache::CacheConfig;
use crate::providers::{RemoteConfig, RetryConfig};
use crate::types::RequestLimits;
use crate::{HuginnError, Result};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8000).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8000".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent requests (default: 100).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// How long a caller waits for audio, in seconds (default: 300).
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Maximum text length in characters (default: 1000).
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Maximum reference-audio upload in bytes (default: 10 MiB).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            request_timeout_secs: default_timeout(),
            max_text_chars: default_max_text_chars(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_max_concurrent() -> usize {
    100
}

fn default_timeout() -> u64 {
    300
}

fn default_max_text_chars() -> usize {
    1000
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Synthesis cache bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Total artifact bytes, in megabytes (default: 512).
    #[serde(default = "default_max_mb")]
    pub max_mb: u64,
    #[serde(default = "default_float_precision")]
    pub float_precision: u32,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_mb: default_max_mb(),
            float_precision: default_float_precision(),
        }
    }
}

fn default_max_entries() -> u64 {
    256
}

fn default_max_mb() -> u64 {
    512
}

fn default_float_precision() -> u32 {
    crate::fingerprint::DEFAULT_FLOAT_PRECISION
}

/// Inference worker connection.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    /// Per-call timeout in seconds (default: 120).
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
    /// Attempts per call on connection failures (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            timeout_secs: default_backend_timeout(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_backend_url() -> String {
    crate::providers::remote::DEFAULT_BASE_URL.to_string()
}

fn default_backend_timeout() -> u64 {
    120
}

fn default_max_attempts() -> u32 {
    3
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.huginn/config.toml`
    /// 3. `/etc/huginn/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HuginnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            HuginnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(HuginnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".huginn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/huginn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.cache.max_entries)
            .max_bytes(self.cache.max_mb.saturating_mul(1024 * 1024))
            .float_precision(self.cache.float_precision)
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits::new()
            .max_text_chars(self.server.limits.max_text_chars)
            .max_reference_bytes(self.server.limits.max_upload_bytes)
    }

    pub fn remote_config(&self) -> RemoteConfig {
        RemoteConfig::new(&self.backend.base_url)
            .timeout(Duration::from_secs(self.backend.timeout_secs))
            .retry(RetryConfig::new().max_attempts(self.backend.max_attempts))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.limits.request_timeout_secs)
    }
}
