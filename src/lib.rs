//! Render SVG documents to PNG through a WebAssembly build of resvg.
//!
//! The renderer itself runs as a guest module inside Wasmtime. This crate
//! ties the pieces together:
//!
//! - [`resvg_host_core`] compiles the guest once and hands out isolated
//!   instances.
//! - [`resvg_host_bindings`] wraps the guest's exports in typed handles and
//!   drives the render pipeline.
//!
//! # Example
//!
//! ```ignore
//! use resvg_host::{RuntimeConfig, install_guest, render_to_png};
//!
//! install_guest(&std::fs::read("resvg_guest.wasm")?, &RuntimeConfig::default())?;
//! let png = render_to_png(svg.as_bytes(), &[font_bytes])?;
//! ```
//!
//! Every call gets a fresh guest instance, so renders on different threads
//! never share guest state.

use tracing::debug;

pub use resvg_host_bindings::{
    Handle, PipelineError, PipelineState, ResourceKind, Session, exports, pipeline,
};
pub use resvg_host_common::{
    BindingError, ConfigError, EngineConfig, ExecutionConfig, RuntimeConfig, RuntimeError,
};
pub use resvg_host_core::{GuestBundle, GuestInstance, GuestRuntime, InstanceId};

/// Renders documents with one compiled guest.
#[derive(Debug, Clone)]
pub struct Renderer {
    bundle: GuestBundle,
}

impl Renderer {
    /// Create a renderer over a compiled guest.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleGuest` if the guest does not export the whole
    /// binding surface.
    pub fn new(bundle: GuestBundle) -> Result<Self, RuntimeError> {
        bundle.module().require_exports(exports::ALL)?;
        Ok(Self { bundle })
    }

    /// Create a renderer without checking the guest's exports.
    ///
    /// For guests that implement part of the surface; a call to a missing
    /// export fails the render with `ExportNotFound`.
    pub fn new_unchecked(bundle: GuestBundle) -> Self {
        Self { bundle }
    }

    /// Compile guest bytes and create a renderer over them.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes fail to compile or link, or do not
    /// export the binding surface.
    pub fn from_bytes(bytes: &[u8], config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        GuestBundle::new(bytes, config).and_then(Self::new)
    }

    /// The compiled guest.
    pub fn bundle(&self) -> &GuestBundle {
        &self.bundle
    }

    /// Render `document` to PNG bytes in a fresh guest instance.
    ///
    /// `fonts` are loaded in order before text is converted.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] naming the stage that failed. Errors
    /// raised while instantiating the guest are reported at
    /// [`PipelineState::Init`].
    pub fn render<F: AsRef<[u8]>>(
        &self,
        document: &[u8],
        fonts: &[F],
    ) -> Result<Vec<u8>, PipelineError> {
        let instance = self.bundle.instantiate().map_err(PipelineError::init)?;
        let mut session = Session::new(instance);

        let result = pipeline::render_to_png(&mut session, document, fonts);

        let instance = session.into_inner();
        debug!(
            instance_id = %instance.instance_id(),
            calls = instance.call_count(),
            guest_logs = instance.context().logs.len(),
            "Guest instance discarded"
        );
        result
    }
}

/// Compile guest bytes and install them as the process-wide guest.
///
/// # Errors
///
/// Returns an error if the bytes fail to compile or do not export the
/// binding surface, or if a guest has already been installed.
pub fn install_guest(bytes: &[u8], config: &RuntimeConfig) -> Result<(), RuntimeError> {
    GuestBundle::install(bytes, config, exports::ALL).map(|_| ())
}

/// Render `document` to PNG bytes with the process-wide guest.
///
/// # Errors
///
/// Fails at [`PipelineState::Init`] if no guest has been installed or the
/// installed guest lacks binding exports; otherwise as [`Renderer::render`].
pub fn render_to_png<F: AsRef<[u8]>>(document: &[u8], fonts: &[F]) -> Result<Vec<u8>, PipelineError> {
    let bundle = GuestBundle::global().ok_or_else(|| {
        PipelineError::init(RuntimeError::invalid_config("Guest bundle not installed"))
    })?;

    Renderer::new(bundle.clone())
        .map_err(PipelineError::init)?
        .render(document, fonts)
}
