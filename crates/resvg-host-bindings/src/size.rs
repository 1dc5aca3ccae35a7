//! Document and screen sizes.

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports;
use crate::handle::{Handle, ScreenSize, Size};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Round a document size to whole pixels.
    ///
    /// The guest refuses degenerate sizes (zero, negative, non-finite) with
    /// a null result.
    pub fn to_screen_size(&mut self, size: &Handle<Size>) -> Result<Handle<ScreenSize>, BindingError> {
        let size = self.arg(size)?;
        self.construct(exports::SIZE_TO_SCREEN_SIZE, &[size])
    }

    /// Width in pixels.
    pub fn screen_width(&mut self, screen: &Handle<ScreenSize>) -> Result<u32, BindingError> {
        self.dimension(exports::SCREEN_SIZE_WIDTH, screen)
    }

    /// Height in pixels.
    pub fn screen_height(&mut self, screen: &Handle<ScreenSize>) -> Result<u32, BindingError> {
        self.dimension(exports::SCREEN_SIZE_HEIGHT, screen)
    }

    fn dimension(
        &mut self,
        export: &'static str,
        screen: &Handle<ScreenSize>,
    ) -> Result<u32, BindingError> {
        let screen = self.arg(screen)?;
        let value = self.call_scalar(export, &[screen])?;
        u32::try_from(value)
            .map_err(|_| BindingError::unexpected_return(export, format!("negative size {value}")))
    }
}
