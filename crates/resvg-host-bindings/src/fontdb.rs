//! Font databases.

use tracing::debug;

use resvg_host_common::BindingError;
use resvg_host_core::GuestRuntime;

use crate::exports;
use crate::handle::{FontDatabase, Handle};
use crate::session::Session;

impl<R: GuestRuntime> Session<R> {
    /// Construct an empty font database.
    pub fn fontdb_new(&mut self) -> Result<Handle<FontDatabase>, BindingError> {
        self.construct(exports::FONTDB_NEW, &[])
    }

    /// Append one font file (TTF, OTF or a collection) to the database.
    ///
    /// Fonts are matched in load order, so callers must load them in the
    /// order they want them preferred.
    pub fn load_font_data(
        &mut self,
        fontdb: &mut Handle<FontDatabase>,
        font: &[u8],
    ) -> Result<(), BindingError> {
        let db = self.arg(fontdb)?;

        self.with_guest_bytes(font, |session, ptr, len| {
            session.call_status(exports::FONTDB_LOAD_FONT_DATA, &[db, ptr, len])
        })?;

        debug!(bytes = font.len(), "Font loaded");
        Ok(())
    }
}
