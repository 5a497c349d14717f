use crate::error::{Error, Result};
use crate::mask::Filter;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Size of the inotify record header in bytes
pub const EVENT_HEADER_SIZE: usize = 16;

/// Smallest buffer guaranteed to hold one record with a maximal file name
pub const MIN_BUFFER_SIZE: usize = EVENT_HEADER_SIZE + libc::NAME_MAX as usize + 1;

/// Upper bound on the read buffer
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Main configuration structure for dirwatch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Configuration for a single monitor instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Size in bytes of the read buffer reused for every batch
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Filters applied when a watch is added without an explicit filter set
    #[serde(default = "default_filters")]
    pub default_filters: Vec<Filter>,

    /// Remove every kernel watch explicitly when the monitor stops
    #[serde(default = "default_true")]
    pub teardown_watches: bool,
}

fn default_buffer_size() -> usize {
    16 * 1024
}

fn default_filters() -> Vec<Filter> {
    vec![Filter::All]
}

fn default_true() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            default_filters: default_filters(),
            teardown_watches: default_true(),
        }
    }
}

impl MonitorConfig {
    /// Create configuration from builder
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Validates the monitor settings
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size < MIN_BUFFER_SIZE || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::config(format!(
                "Invalid buffer size {}. Must be between {MIN_BUFFER_SIZE} and {MAX_BUFFER_SIZE}",
                self.buffer_size
            )));
        }

        if self.default_filters.is_empty() {
            return Err(Error::config(format!(
                "default_filters must not be empty. Valid filters: {:?}",
                Filter::names()
            )));
        }

        Ok(())
    }
}

/// Builder for MonitorConfig
#[derive(Debug, Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// Set the read buffer size in bytes
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Set the filters used when a watch is added without explicit filters
    pub fn default_filters(mut self, filters: Vec<Filter>) -> Self {
        self.config.default_filters = filters;
        self
    }

    /// Set whether kernel watches are removed when the monitor stops
    pub fn teardown_watches(mut self, teardown: bool) -> Self {
        self.config.teardown_watches = teardown;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<MonitorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `DIRWATCH_` and use double underscores
    /// for nested values. For example:
    /// - `DIRWATCH_MONITOR__BUFFER_SIZE=65536`
    /// - `DIRWATCH_MONITOR__DEFAULT_FILTERS=create,delete,moved`
    ///
    /// The merged result is validated before it is returned.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        // Add the config file if it exists
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("DIRWATCH")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("monitor.default_filters")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()
    }

    /// Saves the configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string)
            .map_err(|e| Error::config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }
}
