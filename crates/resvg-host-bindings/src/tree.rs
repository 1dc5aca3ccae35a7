//! Parsed documents.

use tracing::debug;

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports;
use crate::handle::{FontDatabase, Handle, Options, Size, Tree};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Parse an SVG document.
    ///
    /// The document is copied into guest memory for the call and freed
    /// afterwards. A document the guest cannot parse comes back as
    /// [`BindingError::NullResource`].
    pub fn tree_from_data(
        &mut self,
        document: &[u8],
        options: &Handle<Options>,
    ) -> Result<Handle<Tree>, BindingError> {
        let options = self.arg(options)?;

        let tree = self.with_guest_bytes(document, |session, ptr, len| {
            session.construct(exports::TREE_FROM_DATA, &[ptr, len, options])
        })?;

        debug!(bytes = document.len(), ?tree, "Document parsed");
        Ok(tree)
    }

    /// Convert text nodes to paths using the fonts in `fontdb`.
    ///
    /// Mutates the tree in place. The database is only read; it stays owned
    /// by the caller and is not released. Glyphs with no matching font are
    /// substituted by the guest, so an empty database is not an error.
    pub fn convert_text(
        &mut self,
        tree: &Handle<Tree>,
        fontdb: &Handle<FontDatabase>,
        keep_named_groups: bool,
    ) -> Result<(), BindingError> {
        let tree = self.arg(tree)?;
        let fontdb = self.arg(fontdb)?;

        self.call_status(
            exports::TREE_CONVERT_TEXT,
            &[tree, fontdb, i32::from(keep_named_groups)],
        )
    }

    /// Clone the document size out of the tree.
    pub fn tree_size(&mut self, tree: &Handle<Tree>) -> Result<Handle<Size>, BindingError> {
        let tree = self.arg(tree)?;
        self.construct(exports::TREE_GET_SIZE_CLONE, &[tree])
    }
}
