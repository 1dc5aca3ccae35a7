//! Error types for resvg-host.
//!
//! This module defines a hierarchy of error types using `thiserror`:
//! - [`RuntimeError`]: Failures of the Wasmtime adapter itself (compile,
//!   instantiate, invoke, linear-memory access)
//! - [`BindingError`]: Failures of the typed binding layer, including every
//!   host-side handle check

use std::io;

use thiserror::Error;

/// Errors raised by the module runtime adapter.
///
/// Any of these during an export call is fatal to the current operation:
/// the guest either faulted or the export surface does not match.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// WebAssembly compilation failed.
    #[error("Compilation failed: {reason}")]
    CompilationFailed {
        /// Description of the compilation failure.
        reason: String,
    },

    /// The module compiled but could not be instantiated.
    #[error("Instantiation failed: {reason}")]
    InstantiationFailed {
        /// Description of the instantiation failure.
        reason: String,
    },

    /// The guest binary does not provide the exports the host binds to.
    #[error("Incompatible guest: missing exports {}", missing.join(", "))]
    IncompatibleGuest {
        /// Required exports the guest lacks.
        missing: Vec<String>,
    },

    /// The guest does not export a function with the requested name.
    #[error("Export not found: {export}")]
    ExportNotFound {
        /// Name of the missing export.
        export: String,
    },

    /// A WebAssembly trap occurred while running an export.
    #[error("Wasm trap in {export}: {message}")]
    Trap {
        /// Export that was running.
        export: String,
        /// Description of the trap.
        message: String,
    },

    /// An export was called with arguments or results it does not take.
    #[error("Signature mismatch for {export}: {reason}")]
    SignatureMismatch {
        /// Export that was called.
        export: String,
        /// What did not match.
        reason: String,
    },

    /// Execution exhausted the configured fuel limit.
    #[error("Fuel exhausted in {export}: CPU limit exceeded")]
    FuelExhausted {
        /// Export that was running.
        export: String,
    },

    /// A linear-memory read or write fell outside guest memory.
    #[error("Memory access out of bounds: offset {offset}, len {len}")]
    MemoryAccess {
        /// Start offset of the access.
        offset: u32,
        /// Length of the access in bytes.
        len: u32,
    },

    /// Invalid configuration was provided.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    /// Create a new `IncompatibleGuest` error.
    pub fn incompatible_guest<S: ToString>(missing: &[S]) -> Self {
        Self::IncompatibleGuest {
            missing: missing.iter().map(ToString::to_string).collect(),
        }
    }

    /// Create a new `CompilationFailed` error.
    pub fn compilation_failed(reason: impl Into<String>) -> Self {
        Self::CompilationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `InstantiationFailed` error.
    pub fn instantiation_failed(reason: impl Into<String>) -> Self {
        Self::InstantiationFailed {
            reason: reason.into(),
        }
    }

    /// Create a new `ExportNotFound` error.
    pub fn export_not_found(export: impl Into<String>) -> Self {
        Self::ExportNotFound {
            export: export.into(),
        }
    }

    /// Create a new `Trap` error.
    pub fn trap(export: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Trap {
            export: export.into(),
            message: message.into(),
        }
    }

    /// Create a new `SignatureMismatch` error.
    pub fn signature_mismatch(export: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignatureMismatch {
            export: export.into(),
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidConfig` error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error indicates a resource limit was exceeded.
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, Self::FuelExhausted { .. })
    }
}

/// Errors from the typed binding layer.
///
/// The host-side checks (`UseAfterRelease`, `ForeignHandle`, zero-sized
/// `Allocation`) are raised before the guest is called; everything else
/// reflects what the guest returned.
#[derive(Error, Debug)]
pub enum BindingError {
    /// The runtime adapter failed to run an export.
    #[error("Guest call failed: {0}")]
    GuestCall(#[from] RuntimeError),

    /// A constructor export returned a null offset.
    #[error("Guest returned a null {resource} from {step}")]
    NullResource {
        /// Resource kind that failed to construct.
        resource: &'static str,
        /// Export that was asked to construct it.
        step: &'static str,
    },

    /// The pixel buffer could not be allocated.
    #[error("Pixmap allocation failed for {width}x{height}")]
    Allocation {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A handle was used after it had been released.
    #[error("Use of released {resource} handle")]
    UseAfterRelease {
        /// Resource kind of the released handle.
        resource: &'static str,
    },

    /// A handle was passed to a session over a different instance.
    #[error("{resource} handle belongs to instance {found}, not {expected}")]
    ForeignHandle {
        /// Resource kind of the handle.
        resource: &'static str,
        /// Instance the session is bound to.
        expected: u64,
        /// Instance the handle was created by.
        found: u64,
    },

    /// A status-returning export reported failure.
    #[error("{export} failed with status {code}")]
    GuestStatus {
        /// Export that reported the status.
        export: &'static str,
        /// Non-zero status code.
        code: i32,
    },

    /// A host value cannot be passed across the boundary.
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Description of why the argument was invalid.
        reason: String,
    },

    /// An export returned values that do not fit its contract.
    #[error("Unexpected return from {export}: {detail}")]
    UnexpectedReturn {
        /// Export that returned the value.
        export: &'static str,
        /// What was wrong with it.
        detail: String,
    },

    /// An operation failed and releasing its inputs failed too.
    #[error("{primary} (cleanup failed: {} error(s))", .failures.len())]
    CleanupFailed {
        /// The original failure.
        primary: Box<BindingError>,
        /// Release failures that followed it.
        failures: Vec<BindingError>,
    },
}

impl BindingError {
    /// Create a new `NullResource` error.
    pub fn null_resource(resource: &'static str, step: &'static str) -> Self {
        Self::NullResource { resource, step }
    }

    /// Create a new `InvalidArgument` error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a new `UnexpectedReturn` error.
    pub fn unexpected_return(export: &'static str, detail: impl Into<String>) -> Self {
        Self::UnexpectedReturn {
            export,
            detail: detail.into(),
        }
    }

    /// Attach cleanup failures to a primary error.
    ///
    /// Returns `primary` unchanged when there is nothing to attach.
    pub fn with_cleanup(primary: Self, failures: Vec<Self>) -> Self {
        if failures.is_empty() {
            primary
        } else {
            Self::CleanupFailed {
                primary: Box::new(primary),
                failures,
            }
        }
    }

    /// The original failure, looking through `CleanupFailed`.
    pub fn primary(&self) -> &Self {
        match self {
            Self::CleanupFailed { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Returns `true` if a constructor came back null.
    ///
    /// Pixmap allocation failures count: they are the pixel-buffer case of
    /// the same condition.
    pub fn is_null_resource(&self) -> bool {
        matches!(
            self.primary(),
            Self::NullResource { .. } | Self::Allocation { .. }
        )
    }

    /// Returns `true` if this is a pixmap allocation failure.
    pub fn is_allocation(&self) -> bool {
        matches!(self.primary(), Self::Allocation { .. })
    }

    /// Returns `true` if a released handle was used.
    pub fn is_use_after_release(&self) -> bool {
        matches!(self.primary(), Self::UseAfterRelease { .. })
    }

    /// Returns `true` if the guest itself faulted.
    pub fn is_guest_fault(&self) -> bool {
        matches!(self.primary(), Self::GuestCall(_))
    }
}
