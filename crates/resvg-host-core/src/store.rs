//! Per-instance store state.
//!
//! This module provides:
//! - [`GuestContext`]: State attached to each guest instance's store
//! - [`LogEntry`] and [`LogLevel`]: Diagnostics emitted by the guest
//! - [`CallMetrics`]: Export call accounting for each instance

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use wasmtime::{Store, StoreLimits, StoreLimitsBuilder};

use crate::{InstanceId, WasmEngine};
use resvg_host_common::{ExecutionConfig, RuntimeError};

/// Guest log entries kept per instance; older ones are discarded.
pub const MAX_LOG_ENTRIES: usize = 256;

/// Per-instance store data.
///
/// Created together with the instance and dropped with it.
pub struct GuestContext {
    /// Identity of the instance this store belongs to.
    pub instance_id: InstanceId,

    /// The most recent guest log entries, oldest first.
    pub logs: VecDeque<LogEntry>,

    /// Entries discarded to stay within [`MAX_LOG_ENTRIES`].
    pub dropped_logs: u64,

    /// Export call accounting.
    pub metrics: CallMetrics,

    limits: StoreLimits,

    created_at: Instant,
}

/// A single log entry from the guest.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level (debug, info, warn, error).
    pub level: LogLevel,

    /// Log message content.
    pub message: String,

    /// Timestamp when the log was recorded.
    pub timestamp: Instant,
}

/// Log level for guest logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug-level messages.
    Debug,
    /// Informational messages.
    Info,
    /// Warning messages.
    Warn,
    /// Error messages.
    Error,
}

impl LogLevel {
    /// Convert a numeric guest log level.
    ///
    /// `0`=debug, `1`=info, `2`=warn, `3`=error; anything else is info.
    pub fn from_i32(level: i32) -> Self {
        match level {
            0 => LogLevel::Debug,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export call accounting.
#[derive(Debug, Clone, Default)]
pub struct CallMetrics {
    /// Number of export invocations attempted.
    pub calls: u64,

    /// Number of invocations that failed.
    pub failed_calls: u64,

    /// Time spent inside the guest.
    pub guest_time: Duration,
}

impl GuestContext {
    /// Create a new context for the given instance.
    pub fn new(instance_id: InstanceId, config: &ExecutionConfig) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .instances(1)
            .build();

        Self {
            instance_id,
            logs: VecDeque::new(),
            dropped_logs: 0,
            metrics: CallMetrics::default(),
            limits,
            created_at: Instant::now(),
        }
    }

    /// Record a guest log entry.
    pub fn log(&mut self, level: LogLevel, message: String) {
        if self.logs.len() == MAX_LOG_ENTRIES {
            self.logs.pop_front();
            self.dropped_logs += 1;
        }
        self.logs.push_back(LogEntry {
            level,
            message,
            timestamp: Instant::now(),
        });
    }

    /// Time since the instance was created.
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Create a new Wasmtime store for one guest instance.
///
/// # Errors
///
/// Returns an error if fuel cannot be set on the store.
pub fn create_store(
    engine: &WasmEngine,
    config: &ExecutionConfig,
    instance_id: InstanceId,
) -> Result<Store<GuestContext>, RuntimeError> {
    let context = GuestContext::new(instance_id, config);
    let mut store = Store::new(engine.inner(), context);
    store.limiter(|ctx| &mut ctx.limits);

    if engine.is_fuel_metering() {
        store
            .set_fuel(config.max_fuel)
            .map_err(|e| RuntimeError::invalid_config(format!("Failed to set fuel: {e}")))?;
    }

    Ok(store)
}

/// Get remaining fuel from a store.
pub fn get_remaining_fuel(store: &Store<GuestContext>) -> Option<u64> {
    store.get_fuel().ok()
}
