//! Guest instances and the integer-only call boundary.
//!
//! [`GuestRuntime`] is the whole contract the binding layer relies on:
//! call an export by name with `i32` arguments, and read or write linear
//! memory. [`GuestInstance`] implements it over Wasmtime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tracing::{debug, warn};
use wasmtime::{Instance, Memory, Store, Trap, Val, ValType};

use crate::store::{GuestContext, get_remaining_fuel};
use resvg_host_common::RuntimeError;

/// Process-unique identity of one guest instantiation.
///
/// Handles carry the id of the instance that produced them so a session
/// can refuse handles from any other instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The call boundary of one guest instance.
///
/// Implementations are single-threaded and blocking; nothing here yields.
pub trait GuestRuntime {
    /// Identity of the instance behind this runtime.
    fn instance_id(&self) -> InstanceId;

    /// Call an export with `i32` arguments, returning its `i32` results.
    fn call(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, RuntimeError>;

    /// Copy `len` bytes out of linear memory starting at `offset`.
    fn read_memory(&mut self, offset: u32, len: u32) -> Result<Vec<u8>, RuntimeError>;

    /// Copy `bytes` into linear memory starting at `offset`.
    fn write_memory(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError>;
}

impl<R: GuestRuntime + ?Sized> GuestRuntime for &mut R {
    fn instance_id(&self) -> InstanceId {
        (**self).instance_id()
    }

    fn call(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, RuntimeError> {
        (**self).call(export, args)
    }

    fn read_memory(&mut self, offset: u32, len: u32) -> Result<Vec<u8>, RuntimeError> {
        (**self).read_memory(offset, len)
    }

    fn write_memory(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
        (**self).write_memory(offset, bytes)
    }
}

impl<R: GuestRuntime + ?Sized> GuestRuntime for Box<R> {
    fn instance_id(&self) -> InstanceId {
        (**self).instance_id()
    }

    fn call(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, RuntimeError> {
        (**self).call(export, args)
    }

    fn read_memory(&mut self, offset: u32, len: u32) -> Result<Vec<u8>, RuntimeError> {
        (**self).read_memory(offset, len)
    }

    fn write_memory(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
        (**self).write_memory(offset, bytes)
    }
}

/// One live instantiation of the guest module.
///
/// Owns its [`Store`], so dropping it tears the instance down. There is no
/// teardown export.
pub struct GuestInstance {
    store: Store<GuestContext>,
    instance: Instance,
    memory: Option<Memory>,
}

impl GuestInstance {
    pub(crate) fn new(mut store: Store<GuestContext>, instance: Instance) -> Self {
        let memory = instance.get_memory(&mut store, "memory");
        if memory.is_none() {
            warn!(
                instance_id = %store.data().instance_id,
                "Guest module does not export its memory"
            );
        }

        Self {
            store,
            instance,
            memory,
        }
    }

    /// Store data: logs and call metrics.
    pub fn context(&self) -> &GuestContext {
        self.store.data()
    }

    /// Number of export calls made so far.
    pub fn call_count(&self) -> u64 {
        self.store.data().metrics.calls
    }

    /// Fuel left, when metering is enabled.
    pub fn remaining_fuel(&self) -> Option<u64> {
        get_remaining_fuel(&self.store)
    }

    fn memory(&self) -> Result<Memory, RuntimeError> {
        self.memory
            .ok_or_else(|| RuntimeError::export_not_found("memory"))
    }
}

impl GuestRuntime for GuestInstance {
    fn instance_id(&self) -> InstanceId {
        self.store.data().instance_id
    }

    fn call(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, RuntimeError> {
        let func = self
            .instance
            .get_func(&mut self.store, export)
            .ok_or_else(|| RuntimeError::export_not_found(export))?;

        let ty = func.ty(&self.store);
        if ty.params().len() != args.len() {
            return Err(RuntimeError::signature_mismatch(
                export,
                format!("expected {} arguments, got {}", ty.params().len(), args.len()),
            ));
        }
        if let Some(param) = ty.params().find(|p| !matches!(p, ValType::I32)) {
            return Err(RuntimeError::signature_mismatch(
                export,
                format!("takes a {param} parameter"),
            ));
        }
        if let Some(result) = ty.results().find(|r| !matches!(r, ValType::I32)) {
            return Err(RuntimeError::signature_mismatch(
                export,
                format!("returns a {result} value"),
            ));
        }

        let params: Vec<Val> = args.iter().copied().map(Val::I32).collect();
        let mut results = vec![Val::I32(0); ty.results().len()];

        let start = Instant::now();
        let outcome = func.call(&mut self.store, &params, &mut results);
        let elapsed = start.elapsed();

        let metrics = &mut self.store.data_mut().metrics;
        metrics.calls += 1;
        metrics.guest_time += elapsed;

        if let Err(e) = outcome {
            metrics.failed_calls += 1;
            let err = classify_call_error(export, &e);
            warn!(export, error = %err, "Guest call failed");
            return Err(err);
        }

        debug!(export, ?args, elapsed_us = elapsed.as_micros(), "Guest call");

        results
            .iter()
            .map(|v| {
                v.i32().ok_or_else(|| {
                    RuntimeError::signature_mismatch(export, "export returned a non-i32 value")
                })
            })
            .collect()
    }

    fn read_memory(&mut self, offset: u32, len: u32) -> Result<Vec<u8>, RuntimeError> {
        let memory = self.memory()?;
        let start = offset as usize;
        let end = start.checked_add(len as usize);

        // Bounds first: `len` comes from the guest.
        end.and_then(|end| memory.data(&self.store).get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or(RuntimeError::MemoryAccess { offset, len })
    }

    fn write_memory(&mut self, offset: u32, bytes: &[u8]) -> Result<(), RuntimeError> {
        let memory = self.memory()?;
        memory
            .write(&mut self.store, offset as usize, bytes)
            .map_err(|_| RuntimeError::MemoryAccess {
                offset,
                len: u32::try_from(bytes.len()).unwrap_or(u32::MAX),
            })
    }
}

impl std::fmt::Debug for GuestInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestInstance")
            .field("instance_id", &self.store.data().instance_id)
            .field("calls", &self.store.data().metrics.calls)
            .finish_non_exhaustive()
    }
}

/// Map a failed export call to a runtime error.
fn classify_call_error(export: &str, error: &wasmtime::Error) -> RuntimeError {
    match error.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => RuntimeError::FuelExhausted {
            export: export.to_string(),
        },
        Some(trap) => RuntimeError::trap(export, format!("{trap}: {error}")),
        None => RuntimeError::trap(export, error.to_string()),
    }
}
