//! Output scaling policy.
//!
//! A fit mode is consumed by [`Session::render`]; build a new one for
//! every render pass.

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports::{self, f32_arg};
use crate::handle::{FitTo, Handle};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Keep the document's own size.
    pub fn fit_to_original(&mut self) -> Result<Handle<FitTo>, BindingError> {
        self.construct(exports::FIT_TO_ORIGINAL, &[])
    }

    /// Scale the document by `factor`.
    pub fn fit_to_zoom(&mut self, factor: f32) -> Result<Handle<FitTo>, BindingError> {
        self.construct(exports::FIT_TO_ZOOM, &[f32_arg(factor)])
    }

    /// Scale to `width` pixels, keeping the aspect ratio.
    pub fn fit_to_width(&mut self, width: u32) -> Result<Handle<FitTo>, BindingError> {
        let width = pixels(width)?;
        self.construct(exports::FIT_TO_WIDTH, &[width])
    }

    /// Scale to `height` pixels, keeping the aspect ratio.
    pub fn fit_to_height(&mut self, height: u32) -> Result<Handle<FitTo>, BindingError> {
        let height = pixels(height)?;
        self.construct(exports::FIT_TO_HEIGHT, &[height])
    }

    /// Scale to fit inside `width` x `height`, keeping the aspect ratio.
    pub fn fit_to_size(&mut self, width: u32, height: u32) -> Result<Handle<FitTo>, BindingError> {
        let args = [pixels(width)?, pixels(height)?];
        self.construct(exports::FIT_TO_SIZE, &args)
    }
}

fn pixels(value: u32) -> Result<i32, BindingError> {
    i32::try_from(value)
        .map_err(|_| BindingError::invalid_argument(format!("{value} pixels is out of range")))
}
