//! The guest bundle: everything that is compiled once and shared.
//!
//! A [`GuestBundle`] holds the engine, the compiled guest module and the
//! linker. It is immutable after construction and hands out a fresh
//! [`GuestInstance`] per operation. One bundle can be installed as
//! process-wide state with [`GuestBundle::install`], which refuses a guest
//! whose exports do not match what the host binds to.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info, instrument};
use wasmtime::Linker;

use crate::store::{GuestContext, create_store};
use crate::{CompiledModule, GuestInstance, InstanceId, WasmEngine, host};
use resvg_host_common::{ExecutionConfig, RuntimeConfig, RuntimeError};

static GLOBAL_BUNDLE: OnceLock<GuestBundle> = OnceLock::new();

/// Compiled guest module plus what is needed to instantiate it.
///
/// Cloning is cheap and clones share the compiled code.
#[derive(Clone)]
pub struct GuestBundle {
    engine: WasmEngine,
    module: CompiledModule,
    linker: Arc<Linker<GuestContext>>,
    execution: ExecutionConfig,
}

impl GuestBundle {
    /// Compile a guest bundle from WebAssembly bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be configured or the module
    /// fails to compile or link.
    pub fn new(bytes: &[u8], config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let engine = WasmEngine::new(config)?;
        let module = CompiledModule::from_bytes(engine.inner(), bytes)?;
        Self::link(engine, module, config)
    }

    /// Compile a guest bundle from WAT source.
    ///
    /// This is primarily for testing purposes.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation or linking fails.
    pub fn from_wat(wat: &str, config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let engine = WasmEngine::new(config)?;
        let module = CompiledModule::from_wat(engine.inner(), wat)?;
        Self::link(engine, module, config)
    }

    /// Read and compile a guest bundle from a `.wasm` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or compiled.
    pub fn from_file(path: impl AsRef<Path>, config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::new(&bytes, config)
    }

    fn link(
        engine: WasmEngine,
        module: CompiledModule,
        config: &RuntimeConfig,
    ) -> Result<Self, RuntimeError> {
        let mut linker = Linker::new(engine.inner());
        host::register_all(&mut linker)?;
        linker
            .define_unknown_imports_as_traps(module.inner())
            .map_err(|e| RuntimeError::instantiation_failed(format!("Linking failed: {e}")))?;

        Ok(Self {
            engine,
            module,
            linker: Arc::new(linker),
            execution: config.execution.clone(),
        })
    }

    /// Compile `bytes`, check them against the `required` exports and
    /// install the result as process-wide state.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes fail to compile, if the guest lacks
    /// any of `required` (`IncompatibleGuest`), or if a bundle has already
    /// been installed.
    pub fn install(
        bytes: &[u8],
        config: &RuntimeConfig,
        required: &[&str],
    ) -> Result<&'static Self, RuntimeError> {
        let bundle = Self::new(bytes, config)?;
        bundle.module.require_exports(required)?;
        bundle.make_global()
    }

    /// Install this bundle as process-wide state.
    ///
    /// # Errors
    ///
    /// Returns an error if a bundle has already been installed.
    pub fn make_global(self) -> Result<&'static Self, RuntimeError> {
        let content_hash = self.module.content_hash().to_string();

        GLOBAL_BUNDLE
            .set(self)
            .map_err(|_| RuntimeError::invalid_config("Guest bundle already installed"))?;

        info!(content_hash = %content_hash, "Guest bundle installed");

        GLOBAL_BUNDLE
            .get()
            .ok_or_else(|| RuntimeError::invalid_config("Guest bundle not installed"))
    }

    /// The process-wide bundle, if one has been installed.
    pub fn global() -> Option<&'static Self> {
        GLOBAL_BUNDLE.get()
    }

    /// Create a fresh, independent guest instance.
    ///
    /// # Errors
    ///
    /// Returns an error if instantiation fails (e.g. the memory limit is
    /// below what the module declares, or its start function traps).
    #[instrument(skip(self), fields(content_hash = %self.module.content_hash()))]
    pub fn instantiate(&self) -> Result<GuestInstance, RuntimeError> {
        let instance_id = InstanceId::next();
        let mut store = create_store(&self.engine, &self.execution, instance_id)?;

        let instance = self
            .linker
            .instantiate(&mut store, self.module.inner())
            .map_err(|e| RuntimeError::instantiation_failed(e.to_string()))?;

        debug!(instance_id = %instance_id, "Guest instantiated");

        Ok(GuestInstance::new(store, instance))
    }

    /// The compiled guest module.
    pub fn module(&self) -> &CompiledModule {
        &self.module
    }

    /// The engine the module was compiled for.
    pub fn engine(&self) -> &WasmEngine {
        &self.engine
    }
}

impl std::fmt::Debug for GuestBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestBundle")
            .field("module", &self.module)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
