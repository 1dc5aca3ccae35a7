//! Common errors and configuration for resvg-host.
//!
//! This crate provides shared functionality used across the resvg-host workspace:
//! - Error types using `thiserror` for the runtime adapter and the binding layer
//! - Configuration structures for the Wasmtime engine and per-instance limits

pub mod config;
pub mod error;

pub use config::{ConfigError, EngineConfig, ExecutionConfig, RuntimeConfig};
pub use error::{BindingError, RuntimeError};
