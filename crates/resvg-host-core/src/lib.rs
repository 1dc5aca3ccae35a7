//! Wasmtime adapter that hosts the resvg guest module.
//!
//! This crate owns everything that touches Wasmtime directly:
//! - [`WasmEngine`]: Configured Wasmtime engine
//! - [`CompiledModule`]: The compiled guest module
//! - [`GuestBundle`]: Engine, module and linker compiled once per process
//! - [`GuestInstance`]: One instantiation, driven through [`GuestRuntime`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     GuestBundle                         │
//! │  (Process-wide, immutable, shared read-only)            │
//! │  - WasmEngine + CompiledModule + Linker                 │
//! └─────────────────────────────────────────────────────────┘
//!                            │ instantiate()
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │          GuestInstance (Store<GuestContext>)            │
//! │  (One per render, never shared)                         │
//! │  - InstanceId tag                                       │
//! │  - Linear memory                                        │
//! │  - Fuel, call count, guest logs                         │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod bundle;
pub mod engine;
pub mod host;
pub mod instance;
pub mod module;
pub mod store;

pub use bundle::GuestBundle;
pub use engine::WasmEngine;
pub use instance::{GuestInstance, GuestRuntime, InstanceId};
pub use module::CompiledModule;
pub use store::{CallMetrics, GuestContext, LogEntry, LogLevel};
