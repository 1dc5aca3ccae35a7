//! Typed bindings and render pipeline over the resvg guest module.
//!
//! The guest exposes its objects (options, trees, font databases, fit
//! modes, transforms, sizes, pixmaps) as offsets into its linear memory.
//! This crate turns those offsets into [`Handle`]s and every export into a
//! typed method on [`Session`]:
//!
//! - **Construct** returns a handle, or `NullResource` when the guest
//!   returns a null offset.
//! - **Use** checks every handle argument host-side first. A handle from
//!   another instance fails with `ForeignHandle`, a released one with
//!   `UseAfterRelease`. Neither reaches the guest.
//! - **Release** calls the destructor export once; releasing again is a
//!   no-op.
//!
//! [`pipeline::render_to_png`] strings the calls together into a complete
//! SVG to PNG render and releases everything it built on every path.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new(bundle.instantiate()?);
//! let png = pipeline::render_to_png(&mut session, svg, &[font])?;
//! ```

pub mod exports;
pub mod handle;
pub mod pipeline;
pub mod session;

mod fit;
mod fontdb;
mod options;
mod pixmap;
mod render;
mod size;
mod transform;
mod tree;

pub use handle::{
    ByteBuffer, FitTo, FontDatabase, Handle, Options, Pixmap, ResourceKind, ScreenSize, Size,
    Transform, Tree,
};
pub use pipeline::{PipelineError, PipelineState, render_to_png};
pub use session::Session;
