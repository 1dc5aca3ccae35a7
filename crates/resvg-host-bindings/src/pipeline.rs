//! End-to-end render pipeline.
//!
//! [`render_to_png`] drives one session through a fixed sequence of states:
//!
//! ```text
//! Init → OptionsReady → TreeParsed → FontsLoaded → TextConverted
//!      → SizeComputed → BufferAllocated → Rendered → Encoded → Done
//! ```
//!
//! Every resource constructed along the way is recorded. Whatever happens,
//! the recorded resources are released in reverse construction order
//! before the function returns. The fit mode and transform are built right
//! before rendering and are consumed by [`Session::render`].

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::handle::{FontDatabase, Handle, Options, Pixmap, ScreenSize, Size, Tree};
use crate::session::Session;

/// Zoom applied by the pipeline.
pub const DEFAULT_ZOOM: f32 = 1.0;

/// Whether named groups survive text conversion.
pub const KEEP_NAMED_GROUPS: bool = true;

/// States of the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing constructed yet.
    Init,
    /// Parsing options exist.
    OptionsReady,
    /// The document parsed.
    TreeParsed,
    /// Every font blob is in the database.
    FontsLoaded,
    /// Text has been converted to paths.
    TextConverted,
    /// Output dimensions are known.
    SizeComputed,
    /// The pixmap exists.
    BufferAllocated,
    /// The pixmap holds the image.
    Rendered,
    /// The PNG bytes have been read out.
    Encoded,
    /// Everything has been released.
    Done,
}

impl PipelineState {
    /// The state the next edge leads to.
    pub fn next(self) -> Self {
        match self {
            Self::Init => Self::OptionsReady,
            Self::OptionsReady => Self::TreeParsed,
            Self::TreeParsed => Self::FontsLoaded,
            Self::FontsLoaded => Self::TextConverted,
            Self::TextConverted => Self::SizeComputed,
            Self::SizeComputed => Self::BufferAllocated,
            Self::BufferAllocated => Self::Rendered,
            Self::Rendered => Self::Encoded,
            Self::Encoded | Self::Done => Self::Done,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::OptionsReady => "options",
            Self::TreeParsed => "parse",
            Self::FontsLoaded => "load fonts",
            Self::TextConverted => "convert text",
            Self::SizeComputed => "compute size",
            Self::BufferAllocated => "allocate pixmap",
            Self::Rendered => "render",
            Self::Encoded => "encode",
            Self::Done => "release",
        };
        f.write_str(name)
    }
}

/// A failed pipeline run.
///
/// `stage` is the state the pipeline was trying to reach. `cleanup` holds
/// release failures that happened after the primary error.
#[derive(Debug, thiserror::Error)]
#[error("render failed at {stage}: {error}")]
pub struct PipelineError {
    /// State the failing edge was leading to.
    pub stage: PipelineState,
    /// The primary error.
    #[source]
    pub error: BindingError,
    /// Secondary release failures.
    pub cleanup: Vec<BindingError>,
}

impl PipelineError {
    /// Wrap an error raised before the pipeline had a session.
    pub fn init(error: impl Into<BindingError>) -> Self {
        Self {
            stage: PipelineState::Init,
            error: error.into(),
            cleanup: Vec::new(),
        }
    }
}

/// Resources the pipeline currently owns, in construction order.
#[derive(Default)]
struct Owned {
    options: Option<Handle<Options>>,
    tree: Option<Handle<Tree>>,
    fontdb: Option<Handle<FontDatabase>>,
    size: Option<Handle<Size>>,
    screen: Option<Handle<ScreenSize>>,
    pixmap: Option<Handle<Pixmap>>,
}

impl Owned {
    /// Release everything still held, newest first.
    fn release_all<R: GuestRuntime>(&mut self, session: &mut Session<R>) -> Vec<BindingError> {
        let results = [
            self.pixmap.take().map(|mut h| session.release(&mut h)),
            self.screen.take().map(|mut h| session.release(&mut h)),
            self.size.take().map(|mut h| session.release(&mut h)),
            self.fontdb.take().map(|mut h| session.release(&mut h)),
            self.tree.take().map(|mut h| session.release(&mut h)),
            self.options.take().map(|mut h| session.release(&mut h)),
        ];

        results.into_iter().flatten().filter_map(Result::err).collect()
    }
}

/// Render an SVG document to PNG bytes.
///
/// `fonts` are loaded in the given order. The image is rendered at zoom
/// 1.0 with the identity transform. On error no bytes are returned.
#[instrument(skip_all, fields(instance_id = %session.instance_id(), bytes = document.len(), fonts = fonts.len()))]
pub fn render_to_png<R: GuestRuntime, F: AsRef<[u8]>>(
    session: &mut Session<R>,
    document: &[u8],
    fonts: &[F],
) -> Result<Vec<u8>, PipelineError> {
    let start = Instant::now();
    let mut owned = Owned::default();
    let mut state = PipelineState::Init;

    let outcome = run(session, &mut owned, &mut state, document, fonts);
    let mut cleanup = owned.release_all(session);

    match outcome {
        Ok(png) if cleanup.is_empty() => {
            info!(
                bytes = png.len(),
                duration_ms = start.elapsed().as_millis(),
                "Render pipeline complete"
            );
            Ok(png)
        }
        Ok(_) => {
            warn!(count = cleanup.len(), "Render succeeded but release failed");
            let error = cleanup.remove(0);
            Err(PipelineError {
                stage: PipelineState::Done,
                error,
                cleanup,
            })
        }
        Err(error) => {
            let stage = state.next();
            warn!(%stage, error = %error, cleanup_failures = cleanup.len(), "Render pipeline failed");
            Err(PipelineError {
                stage,
                error,
                cleanup,
            })
        }
    }
}

fn run<R: GuestRuntime, F: AsRef<[u8]>>(
    session: &mut Session<R>,
    owned: &mut Owned,
    state: &mut PipelineState,
    document: &[u8],
    fonts: &[F],
) -> Result<Vec<u8>, BindingError> {
    let options = owned.options.insert(session.options_default()?);
    *state = PipelineState::OptionsReady;

    let tree = session.tree_from_data(document, options)?;
    let tree = &*owned.tree.insert(tree);
    *state = PipelineState::TreeParsed;

    let fontdb = owned.fontdb.insert(session.fontdb_new()?);
    for font in fonts {
        session.load_font_data(fontdb, font.as_ref())?;
    }
    *state = PipelineState::FontsLoaded;

    session.convert_text(tree, fontdb, KEEP_NAMED_GROUPS)?;
    *state = PipelineState::TextConverted;

    let size = session.tree_size(tree)?;
    let size = &*owned.size.insert(size);
    let screen = session.to_screen_size(size)?;
    let screen = &*owned.screen.insert(screen);
    let width = session.screen_width(screen)?;
    let height = session.screen_height(screen)?;
    debug!(width, height, "Output size computed");
    *state = PipelineState::SizeComputed;

    let pixmap = owned.pixmap.insert(session.pixmap_new(width, height)?);
    *state = PipelineState::BufferAllocated;

    let fit = session.fit_to_zoom(DEFAULT_ZOOM)?;
    let transform = match session.transform_default() {
        Ok(transform) => transform,
        Err(error) => {
            let mut fit = fit;
            let failures = session.release(&mut fit).err().into_iter().collect();
            return Err(BindingError::with_cleanup(error, failures));
        }
    };
    session.render(tree, fit, transform, pixmap)?;
    *state = PipelineState::Rendered;

    let png = session.encode_png(pixmap)?;
    *state = PipelineState::Encoded;

    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_order() {
        let mut state = PipelineState::Init;
        let mut seen = vec![state];
        while state != PipelineState::Done {
            state = state.next();
            seen.push(state);
        }

        assert_eq!(seen.len(), 10);
        assert_eq!(seen[2], PipelineState::TreeParsed);
        assert_eq!(PipelineState::Done.next(), PipelineState::Done);
    }

    #[test]
    fn test_error_display_names_stage() {
        let err = PipelineError {
            stage: PipelineState::TreeParsed,
            error: BindingError::null_resource("tree", "__usvg_tree_from_data"),
            cleanup: Vec::new(),
        };

        assert_eq!(
            err.to_string(),
            "render failed at parse: Guest returned a null tree from __usvg_tree_from_data"
        );
    }
}
