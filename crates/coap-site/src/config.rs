// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Site configuration.
//!
//! Supports both programmatic and file-based configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Site configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name (used as the diagnostics scope).
    #[serde(default = "default_site_name")]
    pub name: String,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Observation settings.
    #[serde(default)]
    pub observe: ObserveConfig,

    /// Chunked resource settings.
    #[serde(default)]
    pub block: BlockConfig,

    /// Slow resource settings.
    #[serde(default)]
    pub separate: SeparateConfig,

    /// Mutable scalar resource settings.
    #[serde(default)]
    pub basic: BasicConfig,
}

fn default_site_name() -> String {
    "coap-site".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            log_level: default_log_level(),
            observe: ObserveConfig::default(),
            block: BlockConfig::default(),
            separate: SeparateConfig::default(),
            basic: BasicConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("Site name must not be empty".into()));
        }
        if self.observe.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "observe.interval_ms must be > 0".into(),
            ));
        }
        if self.block.max_uploads == 0 {
            return Err(ConfigError::Invalid(
                "block.max_uploads must be > 0".into(),
            ));
        }
        if self.block.filler.is_empty() && self.block.pad_threshold > 0 {
            return Err(ConfigError::Invalid(
                "block.filler must not be empty when block.pad_threshold > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Observation timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserveConfig {
    /// Notification interval in milliseconds.
    #[serde(default = "default_observe_interval")]
    pub interval_ms: u64,
}

fn default_observe_interval() -> u64 {
    5_000
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_observe_interval(),
        }
    }
}

impl ObserveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Chunked blob settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Content is padded until its length exceeds this many bytes.
    #[serde(default = "default_pad_threshold")]
    pub pad_threshold: usize,

    /// Filler appended while padding.
    #[serde(default = "default_filler")]
    pub filler: String,

    /// Content before the first PUT.
    #[serde(default = "default_block_content")]
    pub initial_content: String,

    /// Concurrent block-wise uploads kept (one per peer).
    #[serde(default = "default_max_uploads")]
    pub max_uploads: usize,

    /// Idle time after which an unfinished upload is dropped, in milliseconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_ms: u64,
}

fn default_pad_threshold() -> usize {
    1024
}

fn default_filler() -> String {
    "0123456789\n".to_string()
}

fn default_block_content() -> String {
    "This is the resource's default content. It is padded with numbers to be \
     large enough to trigger blockwise transfer.\n"
        .to_string()
}

fn default_max_uploads() -> usize {
    64
}

/// EXCHANGE_LIFETIME from RFC 7252.
fn default_upload_timeout() -> u64 {
    247_000
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            pad_threshold: default_pad_threshold(),
            filler: default_filler(),
            initial_content: default_block_content(),
            max_uploads: default_max_uploads(),
            upload_timeout_ms: default_upload_timeout(),
        }
    }
}

impl BlockConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

/// Slow resource settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparateConfig {
    /// Simulated processing latency in milliseconds.
    #[serde(default = "default_separate_delay")]
    pub delay_ms: u64,
}

fn default_separate_delay() -> u64 {
    3_000
}

impl Default for SeparateConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_separate_delay(),
        }
    }
}

impl SeparateConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Mutable scalar resource settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicConfig {
    #[serde(default = "default_basic_content")]
    pub initial_content: String,
}

fn default_basic_content() -> String {
    " ".to_string()
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            initial_content: default_basic_content(),
        }
    }
}
