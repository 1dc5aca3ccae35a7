//! Helpers shared by the facade tests.

use resvg_host::{GuestBundle, GuestRuntime, RuntimeConfig, Session};

/// A guest exporting the whole binding surface.
pub const STUB_GUEST: &str = include_str!("../guest/stub_guest.wat");

pub fn stub_bundle() -> GuestBundle {
    GuestBundle::from_wat(STUB_GUEST, &RuntimeConfig::default()).unwrap()
}

/// Cells the stub guest has handed out and not had back.
#[allow(dead_code)]
pub fn live<R: GuestRuntime>(session: &mut Session<R>) -> i32 {
    session.runtime_mut().call("live", &[]).unwrap()[0]
}
