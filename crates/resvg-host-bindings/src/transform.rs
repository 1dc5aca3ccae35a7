//! Affine transforms applied at render time.

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports::{self, f32_arg};
use crate::handle::{Handle, Transform};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// The identity transform.
    pub fn transform_default(&mut self) -> Result<Handle<Transform>, BindingError> {
        self.construct(exports::TRANSFORM_DEFAULT, &[])
    }

    /// A transform from its six coefficients, in `tiny_skia` row order.
    pub fn transform_from_row(
        &mut self,
        sx: f32,
        ky: f32,
        kx: f32,
        sy: f32,
        tx: f32,
        ty: f32,
    ) -> Result<Handle<Transform>, BindingError> {
        let args = [sx, ky, kx, sy, tx, ty].map(f32_arg);
        self.construct(exports::TRANSFORM_FROM_ROW, &args)
    }
}
