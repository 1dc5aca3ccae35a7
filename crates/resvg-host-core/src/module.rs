//! Guest module compilation.
//!
//! The renderer ships as a plain core module. [`CompiledModule`] compiles
//! it once, remembers a fingerprint of the bytes for log correlation, and
//! answers questions about its export surface.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Instant;

use tracing::{info, instrument, warn};
use wasmtime::{Engine, ExternType, Module};

use resvg_host_common::RuntimeError;

const MAGIC: &[u8; 4] = b"\0asm";

/// Core module binary format version. Components use a different layer.
const CORE_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

/// The guest module, compiled for one engine.
#[derive(Clone)]
pub struct CompiledModule {
    module: Module,
    fingerprint: String,
}

impl CompiledModule {
    /// Compile a guest binary.
    ///
    /// # Errors
    ///
    /// Returns `CompilationFailed` if the bytes are not a core module
    /// binary or Cranelift rejects them.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn from_bytes(engine: &Engine, bytes: &[u8]) -> Result<Self, RuntimeError> {
        let start = Instant::now();
        check_preamble(bytes)?;

        let module = Module::from_binary(engine, bytes)
            .map_err(|e| RuntimeError::compilation_failed(format!("{e:#}")))?;
        let compiled = Self::wrap(module, bytes);

        if !compiled.exports_memory() {
            warn!(fingerprint = %compiled.fingerprint, "Guest does not export `memory`");
        }
        info!(
            fingerprint = %compiled.fingerprint,
            functions = compiled.function_exports().count(),
            duration_ms = start.elapsed().as_millis(),
            "Guest compiled"
        );
        Ok(compiled)
    }

    /// Compile a guest from WebAssembly text. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns `CompilationFailed` if the text does not parse or compile.
    pub fn from_wat(engine: &Engine, wat: &str) -> Result<Self, RuntimeError> {
        let module = Module::new(engine, wat)
            .map_err(|e| RuntimeError::compilation_failed(format!("{e:#}")))?;
        Ok(Self::wrap(module, wat.as_bytes()))
    }

    fn wrap(module: Module, source: &[u8]) -> Self {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);

        Self {
            module,
            fingerprint: format!("{:016x}", hasher.finish()),
        }
    }

    /// Fingerprint of the source bytes.
    pub fn content_hash(&self) -> &str {
        &self.fingerprint
    }

    pub fn inner(&self) -> &Module {
        &self.module
    }

    /// Names of the exported functions.
    pub fn function_exports(&self) -> impl Iterator<Item = &str> + '_ {
        self.module
            .exports()
            .filter(|export| matches!(export.ty(), ExternType::Func(_)))
            .map(|export| export.name())
    }

    /// Whether the module exports its linear memory as `memory`.
    pub fn exports_memory(&self) -> bool {
        matches!(self.module.get_export("memory"), Some(ExternType::Memory(_)))
    }

    /// Which of `required` the module does not export as functions.
    pub fn missing_exports<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|name| !matches!(self.module.get_export(name), Some(ExternType::Func(_))))
            .collect()
    }

    /// Fail unless the module exports its memory and every function in
    /// `required`.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleGuest` naming everything that is missing.
    pub fn require_exports(&self, required: &[&str]) -> Result<(), RuntimeError> {
        let mut missing = self.missing_exports(required);
        if !self.exports_memory() {
            missing.insert(0, "memory");
        }
        if missing.is_empty() {
            return Ok(());
        }

        warn!(fingerprint = %self.fingerprint, ?missing, "Guest export surface does not match");
        Err(RuntimeError::incompatible_guest(&missing))
    }
}

impl std::fmt::Debug for CompiledModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledModule")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

fn check_preamble(bytes: &[u8]) -> Result<(), RuntimeError> {
    let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
        return Err(RuntimeError::compilation_failed("not a Wasm binary: too short"));
    };
    if magic != MAGIC {
        return Err(RuntimeError::compilation_failed("not a Wasm binary: bad magic"));
    }
    match rest.first_chunk::<4>() {
        Some(version) if *version == CORE_VERSION => Ok(()),
        Some(_) => Err(RuntimeError::compilation_failed(
            "guest must be a core module, not a component",
        )),
        None => Err(RuntimeError::compilation_failed("not a Wasm binary: too short")),
    }
}
