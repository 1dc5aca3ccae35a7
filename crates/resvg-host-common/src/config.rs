//! Configuration structures for resvg-host.
//!
//! - [`RuntimeConfig`]: Top-level configuration containing all settings
//! - [`EngineConfig`]: Wasmtime engine settings shared by every instance
//! - [`ExecutionConfig`]: Per-instance limits (fuel, linear memory)
//!
//! # Example
//!
//! ```toml
//! [engine]
//! pooling_allocator = true
//! max_instances = 32
//! instance_memory_mb = 512
//!
//! [execution]
//! fuel_metering = true
//! max_fuel = 5_000_000_000
//! max_memory_mb = 512
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuntimeConfig {
    /// Wasmtime engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Per-instance execution configuration.
    #[serde(default)]
    pub execution: ExecutionConfig,
}

impl RuntimeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed as TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings can host a guest at all.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { reason });

        if self.execution.max_memory_mb == 0 {
            return invalid("execution.max_memory_mb must be at least 1".into());
        }
        if self.execution.fuel_metering && self.execution.max_fuel == 0 {
            return invalid("execution.max_fuel must be positive when metering".into());
        }
        if self.engine.pooling_allocator {
            if self.engine.max_instances == 0 {
                return invalid("engine.max_instances must be at least 1".into());
            }
            if self.engine.instance_memory_mb < self.execution.max_memory_mb {
                return invalid(format!(
                    "engine.instance_memory_mb ({}) is below execution.max_memory_mb ({})",
                    self.engine.instance_memory_mb, self.execution.max_memory_mb
                ));
            }
        }
        Ok(())
    }
}

/// Wasmtime engine configuration.
///
/// These settings are fixed when the guest bundle is compiled and apply to
/// every instance created from it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Enable the pooling allocator.
    ///
    /// Worth it when many renders run back to back; every render gets a
    /// fresh instance.
    #[serde(default)]
    pub pooling_allocator: bool,

    /// Maximum concurrent instances in the pool.
    ///
    /// Only effective when `pooling_allocator` is enabled.
    #[serde(default = "defaults::max_instances")]
    pub max_instances: u32,

    /// Memory per pooled instance slot in megabytes.
    #[serde(default = "defaults::instance_memory_mb")]
    pub instance_memory_mb: u32,

    /// Compile with Cranelift's speed optimizations.
    #[serde(default = "defaults::optimize")]
    pub optimize: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pooling_allocator: false,
            max_instances: defaults::max_instances(),
            instance_memory_mb: defaults::instance_memory_mb(),
            optimize: defaults::optimize(),
        }
    }
}

/// Per-instance execution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Enable fuel metering.
    ///
    /// The budget covers the whole life of an instance, i.e. one complete
    /// render pipeline.
    #[serde(default)]
    pub fuel_metering: bool,

    /// Fuel available to one instance.
    #[serde(default = "defaults::max_fuel")]
    pub max_fuel: u64,

    /// Maximum linear memory in megabytes.
    #[serde(default = "defaults::max_memory_mb")]
    pub max_memory_mb: u32,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fuel_metering: false,
            max_fuel: defaults::max_fuel(),
            max_memory_mb: defaults::max_memory_mb(),
        }
    }
}

impl ExecutionConfig {
    /// Linear memory ceiling in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_mb as usize) * 1024 * 1024
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("Failed to parse config file: {message}")]
    Parse { message: String },

    /// Settings parsed but cannot work together.
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },
}

/// Default value functions for serde.
mod defaults {
    pub const fn max_instances() -> u32 {
        16
    }

    pub const fn instance_memory_mb() -> u32 {
        256
    }

    pub const fn optimize() -> bool {
        true
    }

    pub const fn max_fuel() -> u64 {
        10_000_000_000
    }

    pub const fn max_memory_mb() -> u32 {
        256
    }
}
