//! Crate configuration.
//!
//! Loaded from a TOML file with per-section defaults, so a partial (or
//! absent) file always yields a runnable configuration. Environment
//! variables override the fields operators most often need to tweak in
//! deployment.

use crate::transport::AudioQuality;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cooldown: CooldownConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from a TOML file if it exists, falling back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment-variable overrides on top of file values.
    ///
    /// `JUKEBOT_LOG_LEVEL` and `JUKEBOT_YTDLP_BIN` take priority over the
    /// TOML file so deployments can tweak them without editing config.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("JUKEBOT_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(bin) = std::env::var("JUKEBOT_YTDLP_BIN") {
            if !bin.is_empty() {
                self.extractor.binary = bin;
            }
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: "json" for structured JSON, "pretty" for human-readable
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Per-chat command rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownConfig {
    /// Minimum spacing between accepted commands per chat, in seconds.
    /// 0 disables rate limiting.
    #[serde(default = "default_cooldown_window")]
    pub window_secs: u64,
}

fn default_cooldown_window() -> u64 {
    2
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            window_secs: default_cooldown_window(),
        }
    }
}

impl CooldownConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Resolved-metadata cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether query results are cached at all (default: true)
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// How long a cached track stays valid, in seconds (default: 600)
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Metadata extraction backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Extractor binary to spawn (default: "yt-dlp")
    #[serde(default = "default_extractor_binary")]
    pub binary: String,

    /// Hard deadline for one extraction attempt, in seconds (default: 12)
    #[serde(default = "default_extractor_timeout")]
    pub timeout_secs: u64,

    /// Treat non-URL queries as search terms (default: true)
    #[serde(default = "default_extractor_search")]
    pub search: bool,
}

fn default_extractor_binary() -> String {
    "yt-dlp".to_string()
}

fn default_extractor_timeout() -> u64 {
    12
}

fn default_extractor_search() -> bool {
    true
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            binary: default_extractor_binary(),
            timeout_secs: default_extractor_timeout(),
            search: default_extractor_search(),
        }
    }
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Voice transport preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Quality hint passed to the richly-typed join strategy (default: high)
    #[serde(default)]
    pub quality: AudioQuality,
}

#[allow(clippy::derivable_impls)]
impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            quality: AudioQuality::default(),
        }
    }
}
