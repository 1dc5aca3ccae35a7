//! Parsing options.

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports;
use crate::handle::{Handle, Options};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Construct default parsing options.
    ///
    /// Options are read by [`Session::tree_from_data`] and never mutated.
    pub fn options_default(&mut self) -> Result<Handle<Options>, BindingError> {
        self.construct(exports::OPTIONS_DEFAULT, &[])
    }
}
