//! The render pass.

use tracing::{debug, warn};

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports;
use crate::handle::{FitTo, Handle, Pixmap, Transform, Tree};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Render `tree` into `pixmap`.
    ///
    /// Parameter roles:
    /// - `tree` and `pixmap` are borrowed and stay owned by the caller, who
    ///   can encode the pixmap afterwards.
    /// - `fit` and `transform` are consumed. On success the guest has taken
    ///   them; on any failure they are released here before returning.
    ///
    /// Every handle is checked before the guest is called.
    pub fn render(
        &mut self,
        tree: &Handle<Tree>,
        mut fit: Handle<FitTo>,
        mut transform: Handle<Transform>,
        pixmap: &mut Handle<Pixmap>,
    ) -> Result<(), BindingError> {
        let result = self.render_checked(tree, &fit, &transform, pixmap);

        match result {
            Ok(()) => {
                fit.mark_released();
                transform.mark_released();
                debug!(instance_id = %self.instance_id(), "Render complete");
                Ok(())
            }
            Err(error) => {
                let failures: Vec<BindingError> = [
                    self.release(&mut fit).err(),
                    self.release(&mut transform).err(),
                ]
                .into_iter()
                .flatten()
                .collect();

                if !failures.is_empty() {
                    warn!(count = failures.len(), "Releasing render inputs failed");
                }
                Err(BindingError::with_cleanup(error, failures))
            }
        }
    }

    fn render_checked(
        &mut self,
        tree: &Handle<Tree>,
        fit: &Handle<FitTo>,
        transform: &Handle<Transform>,
        pixmap: &Handle<Pixmap>,
    ) -> Result<(), BindingError> {
        let args = [
            self.arg(tree)?,
            self.arg(fit)?,
            self.arg(transform)?,
            self.arg(pixmap)?,
        ];
        self.call_status(exports::RENDER, &args)
    }
}
