//! Host-side handles to guest-owned objects.
//!
//! A [`Handle`] is an opaque token: the guest offset it wraps is never
//! exposed, it is tagged with the [`InstanceId`] that produced it, and it
//! remembers whether it has been released. Handles are deliberately neither
//! `Clone` nor `Copy`, so each guest object has exactly one host owner.

use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;

use resvg_host_common::BindingError;
use resvg_host_core::InstanceId;

use crate::exports;

/// A kind of guest object, and the export that destroys it.
pub trait ResourceKind {
    /// Human-readable name used in errors and logs.
    const NAME: &'static str;

    /// Export that frees an object of this kind.
    const DESTRUCTOR: &'static str;
}

macro_rules! resource_kind {
    ($(#[$meta:meta])* $kind:ident, $name:literal, $destructor:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $kind {}

        impl ResourceKind for $kind {
            const NAME: &'static str = $name;
            const DESTRUCTOR: &'static str = $destructor;
        }
    };
}

resource_kind!(
    /// Parsing options (`usvg::Options`).
    Options, "options", exports::OPTIONS_FREE
);
resource_kind!(
    /// A parsed document (`usvg::Tree`).
    Tree, "tree", exports::TREE_FREE
);
resource_kind!(
    /// A font collection (`fontdb::Database`).
    FontDatabase, "font database", exports::FONTDB_FREE
);
resource_kind!(
    /// Output scaling policy (`usvg::FitTo`).
    FitTo, "fit mode", exports::FIT_TO_FREE
);
resource_kind!(
    /// A 2-D affine transform (`tiny_skia::Transform`).
    Transform, "transform", exports::TRANSFORM_FREE
);
resource_kind!(
    /// Floating-point document size (`usvg::Size`).
    Size, "size", exports::SIZE_FREE
);
resource_kind!(
    /// Integer pixel size (`usvg::ScreenSize`).
    ScreenSize, "screen size", exports::SCREEN_SIZE_FREE
);
resource_kind!(
    /// The output raster (`tiny_skia::Pixmap`).
    Pixmap, "pixmap", exports::PIXMAP_FREE
);
resource_kind!(
    /// A guest-owned byte vector handed back to the host.
    ByteBuffer, "byte buffer", exports::BYTES_FREE
);

/// Host ownership of one guest object of kind `K`.
pub struct Handle<K: ResourceKind> {
    owner: InstanceId,
    offset: NonZeroU32,
    released: bool,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Handle<K> {
    /// Wrap the value a constructor export returned.
    ///
    /// A zero return is the guest's way of saying construction failed.
    pub(crate) fn from_raw(
        owner: InstanceId,
        raw: i32,
        step: &'static str,
    ) -> Result<Self, BindingError> {
        let offset = NonZeroU32::new(u32::from_ne_bytes(raw.to_ne_bytes()))
            .ok_or_else(|| BindingError::null_resource(K::NAME, step))?;

        Ok(Self {
            owner,
            offset,
            released: false,
            _kind: PhantomData,
        })
    }

    /// Instance that produced this handle.
    pub fn owner(&self) -> InstanceId {
        self.owner
    }

    /// Whether the guest object is gone.
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Resource kind name.
    pub fn kind(&self) -> &'static str {
        K::NAME
    }

    /// Check that this handle may be passed to an export of `instance`.
    pub(crate) fn check(&self, instance: InstanceId) -> Result<i32, BindingError> {
        if self.owner != instance {
            return Err(BindingError::ForeignHandle {
                resource: K::NAME,
                expected: instance.as_u64(),
                found: self.owner.as_u64(),
            });
        }
        if self.released {
            return Err(BindingError::UseAfterRelease { resource: K::NAME });
        }
        Ok(self.raw())
    }

    pub(crate) fn raw(&self) -> i32 {
        i32::from_ne_bytes(self.offset.get().to_ne_bytes())
    }

    pub(crate) fn mark_released(&mut self) {
        self.released = true;
    }
}

impl<K: ResourceKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &K::NAME)
            .field("owner", &self.owner)
            .field("offset", &format!("{:#x}", self.offset))
            .field("released", &self.released)
            .finish()
    }
}
