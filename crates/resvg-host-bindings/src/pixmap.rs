//! Output rasters.

use tracing::debug;

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports;
use crate::handle::{ByteBuffer, Handle, Pixmap};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Allocate a transparent pixmap.
    ///
    /// Zero-sized pixmaps are refused before the guest is called; the
    /// guest refuses sizes it cannot allocate with a null result. Both
    /// surface as [`BindingError::Allocation`].
    pub fn pixmap_new(&mut self, width: u32, height: u32) -> Result<Handle<Pixmap>, BindingError> {
        let allocation = || BindingError::Allocation { width, height };

        if width == 0 || height == 0 {
            return Err(allocation());
        }
        let args = [
            i32::try_from(width).map_err(|_| allocation())?,
            i32::try_from(height).map_err(|_| allocation())?,
        ];

        match self.construct(exports::PIXMAP_NEW, &args) {
            Err(BindingError::NullResource { .. }) => Err(allocation()),
            other => other,
        }
    }

    /// Encode the pixmap as PNG.
    ///
    /// The pixmap is left untouched and still owned by the caller.
    pub fn encode_png(&mut self, pixmap: &Handle<Pixmap>) -> Result<Vec<u8>, BindingError> {
        let pixmap = self.arg(pixmap)?;
        let buffer: Handle<ByteBuffer> = self.construct(exports::PIXMAP_ENCODE_PNG, &[pixmap])?;
        let png = self.take_bytes(buffer)?;

        debug!(bytes = png.len(), "Pixmap encoded");
        Ok(png)
    }
}
