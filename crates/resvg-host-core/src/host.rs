//! Host functions offered to the guest.
//!
//! The renderer needs nothing from the host to do its work. The only
//! import provided is `env::log`, a diagnostic channel guest builds may
//! use; imports beyond that are stubbed as traps when the bundle links.

use tracing::{debug, error, info, warn};
use wasmtime::{Caller, Extern, Linker};

use crate::store::{GuestContext, LogLevel};
use resvg_host_common::RuntimeError;

/// Guest messages longer than this are cut.
pub const MAX_LOG_BYTES: usize = 4096;

/// Register every host function.
///
/// # Errors
///
/// Returns `InvalidConfig` if a function is already defined on `linker`.
pub fn register_all(linker: &mut Linker<GuestContext>) -> Result<(), RuntimeError> {
    register_logging(linker)
}

/// Register `env::log(level: i32, ptr: i32, len: i32)`.
///
/// `level` is 0 debug, 1 info, 2 warn, 3 error. The message is `len`
/// bytes of UTF-8 at `ptr`; invalid sequences are replaced. A bad
/// pointer drops the message instead of trapping the guest.
///
/// # Errors
///
/// Returns `InvalidConfig` if `env::log` is already defined.
pub fn register_logging(linker: &mut Linker<GuestContext>) -> Result<(), RuntimeError> {
    linker
        .func_wrap("env", "log", guest_log)
        .map_err(|e| RuntimeError::invalid_config(format!("Cannot define env::log: {e}")))?;
    Ok(())
}

fn guest_log(mut caller: Caller<'_, GuestContext>, level: i32, ptr: i32, len: i32) {
    let instance_id = caller.data().instance_id;
    let Some(message) = read_guest_str(&mut caller, ptr, len) else {
        warn!(%instance_id, ptr, len, "Dropped guest log with invalid pointer");
        return;
    };

    let level = LogLevel::from_i32(level);
    match level {
        LogLevel::Debug => debug!(%instance_id, guest = true, "{message}"),
        LogLevel::Info => info!(%instance_id, guest = true, "{message}"),
        LogLevel::Warn => warn!(%instance_id, guest = true, "{message}"),
        LogLevel::Error => error!(%instance_id, guest = true, "{message}"),
    }
    caller.data_mut().log(level, message);
}

/// Copy a string out of the caller's exported memory.
fn read_guest_str(caller: &mut Caller<'_, GuestContext>, ptr: i32, len: i32) -> Option<String> {
    let start = usize::try_from(ptr).ok()?;
    let len = usize::try_from(len).ok()?.min(MAX_LOG_BYTES);
    let memory = caller.get_export("memory").and_then(Extern::into_memory)?;

    let bytes = memory.data(&*caller).get(start..start.checked_add(len)?)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}
