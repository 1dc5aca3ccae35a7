//! The instance-bound capability every binding call goes through.
//!
//! A [`Session`] wraps one [`GuestRuntime`] and is the only way to invoke
//! the typed wrappers. Before any export sees a handle, the session checks
//! that the handle was produced by the same instance and is still live.
//! The per-resource wrappers live in sibling modules as further
//! `impl Session` blocks.

use tracing::debug;

use resvg_host_common::BindingError;
use resvg_host_core::{GuestRuntime, InstanceId};

use crate::exports;
use crate::handle::{ByteBuffer, Handle, ResourceKind};

/// Typed access to one guest instance.
pub struct Session<R: GuestRuntime> {
    runtime: R,
    instance: InstanceId,
}

impl<R: GuestRuntime> Session<R> {
    /// Bind a session to a runtime.
    pub fn new(runtime: R) -> Self {
        let instance = runtime.instance_id();
        Self { runtime, instance }
    }

    /// Instance this session is bound to.
    pub fn instance_id(&self) -> InstanceId {
        self.instance
    }

    /// The underlying runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Mutable access to the underlying runtime.
    ///
    /// Calls made through it bypass the handle checks.
    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    /// Unwrap the session, returning the runtime.
    pub fn into_inner(self) -> R {
        self.runtime
    }

    /// Release a guest object.
    ///
    /// Calls the kind's destructor export, then marks the handle released.
    /// Releasing an already released handle does nothing. The handle is
    /// marked released even if the destructor fails: calls are never
    /// retried, so a second attempt could only free the object twice.
    pub fn release<K: ResourceKind>(&mut self, handle: &mut Handle<K>) -> Result<(), BindingError> {
        if handle.owner() != self.instance {
            return Err(BindingError::ForeignHandle {
                resource: K::NAME,
                expected: self.instance.as_u64(),
                found: handle.owner().as_u64(),
            });
        }
        if handle.is_released() {
            return Ok(());
        }

        let raw = handle.raw();
        handle.mark_released();
        debug!(resource = K::NAME, instance_id = %self.instance, "Releasing guest object");
        self.call_unit(K::DESTRUCTOR, &[raw])
    }

    /// Check a handle argument.
    pub(crate) fn arg<K: ResourceKind>(&self, handle: &Handle<K>) -> Result<i32, BindingError> {
        handle.check(self.instance)
    }

    /// Call an export whose results are ignored.
    pub(crate) fn call_unit(&mut self, export: &'static str, args: &[i32]) -> Result<(), BindingError> {
        self.runtime.call(export, args)?;
        Ok(())
    }

    /// Call an export that returns exactly one value.
    pub(crate) fn call_scalar(
        &mut self,
        export: &'static str,
        args: &[i32],
    ) -> Result<i32, BindingError> {
        match self.runtime.call(export, args)?.as_slice() {
            [value] => Ok(*value),
            other => Err(BindingError::unexpected_return(
                export,
                format!("expected one result, got {}", other.len()),
            )),
        }
    }

    /// Call an export that returns a status code, `0` meaning success.
    pub(crate) fn call_status(
        &mut self,
        export: &'static str,
        args: &[i32],
    ) -> Result<(), BindingError> {
        match self.call_scalar(export, args)? {
            0 => Ok(()),
            code => Err(BindingError::GuestStatus { export, code }),
        }
    }

    /// Call a constructor export and wrap its result.
    pub(crate) fn construct<K: ResourceKind>(
        &mut self,
        export: &'static str,
        args: &[i32],
    ) -> Result<Handle<K>, BindingError> {
        let raw = self.call_scalar(export, args)?;
        Handle::from_raw(self.instance, raw, export)
    }

    /// Copy `bytes` into guest memory for the duration of `f`.
    ///
    /// `f` receives the guest pointer and length. The guest copy is freed on
    /// every path; a failure to free it is attached to an error from `f`.
    pub(crate) fn with_guest_bytes<T>(
        &mut self,
        bytes: &[u8],
        f: impl FnOnce(&mut Self, i32, i32) -> Result<T, BindingError>,
    ) -> Result<T, BindingError> {
        let len = i32::try_from(bytes.len()).map_err(|_| {
            BindingError::invalid_argument(format!(
                "{} bytes do not fit in guest memory",
                bytes.len()
            ))
        })?;

        if bytes.is_empty() {
            return f(self, 0, 0);
        }

        let ptr = self.call_scalar(exports::ALLOC, &[len])?;
        if ptr == 0 {
            return Err(BindingError::null_resource("byte buffer", exports::ALLOC));
        }

        let result = self
            .runtime
            .write_memory(u32::from_ne_bytes(ptr.to_ne_bytes()), bytes)
            .map_err(BindingError::from)
            .and_then(|()| f(self, ptr, len));
        let freed = self.call_unit(exports::DEALLOC, &[ptr, len]);

        match (result, freed) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => Err(BindingError::with_cleanup(e, vec![cleanup])),
        }
    }

    /// Copy a guest byte buffer out and release it.
    pub(crate) fn take_bytes(
        &mut self,
        mut buffer: Handle<ByteBuffer>,
    ) -> Result<Vec<u8>, BindingError> {
        let result = self.read_bytes(&buffer);
        let freed = self.release(&mut buffer);

        match (result, freed) {
            (Ok(bytes), Ok(())) => Ok(bytes),
            (Ok(_), Err(e)) | (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => Err(BindingError::with_cleanup(e, vec![cleanup])),
        }
    }

    fn read_bytes(&mut self, buffer: &Handle<ByteBuffer>) -> Result<Vec<u8>, BindingError> {
        let raw = self.arg(buffer)?;
        let ptr = self.call_scalar(exports::BYTES_PTR, &[raw])?;
        let len = self.call_scalar(exports::BYTES_LEN, &[raw])?;

        let len = u32::try_from(len).map_err(|_| {
            BindingError::unexpected_return(exports::BYTES_LEN, format!("negative length {len}"))
        })?;
        if len == 0 {
            return Ok(Vec::new());
        }

        Ok(self
            .runtime
            .read_memory(u32::from_ne_bytes(ptr.to_ne_bytes()), len)?)
    }
}

impl<R: GuestRuntime> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::handle::Options;
    use resvg_host_common::RuntimeError;

    /// Records calls; constructors hand out increasing offsets.
    pub(crate) struct RecordingGuest {
        pub id: InstanceId,
        pub calls: Vec<(String, Vec<i32>)>,
        pub next: i32,
        pub fail: Option<&'static str>,
    }

    impl RecordingGuest {
        pub(crate) fn new() -> Self {
            Self {
                id: InstanceId::next(),
                calls: Vec::new(),
                next: 16,
                fail: None,
            }
        }

        pub(crate) fn count(&self, export: &str) -> usize {
            self.calls.iter().filter(|(name, _)| name == export).count()
        }
    }

    impl GuestRuntime for RecordingGuest {
        fn instance_id(&self) -> InstanceId {
            self.id
        }

        fn call(&mut self, export: &str, args: &[i32]) -> Result<Vec<i32>, RuntimeError> {
            self.calls.push((export.to_string(), args.to_vec()));
            if self.fail == Some(export) {
                return Err(RuntimeError::trap(export, "unreachable"));
            }
            if export.ends_with("_free") || export == exports::DEALLOC {
                return Ok(Vec::new());
            }
            if export == exports::RENDER {
                return Ok(vec![0]);
            }
            self.next += 16;
            Ok(vec![self.next])
        }

        fn read_memory(&mut self, _offset: u32, len: u32) -> Result<Vec<u8>, RuntimeError> {
            Ok(vec![0; len as usize])
        }

        fn write_memory(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut session = Session::new(RecordingGuest::new());
        let mut options: Handle<Options> = session.construct(exports::OPTIONS_DEFAULT, &[]).unwrap();

        session.release(&mut options).unwrap();
        session.release(&mut options).unwrap();

        assert!(options.is_released());
        assert_eq!(session.runtime().count(exports::OPTIONS_FREE), 1);
    }

    #[test]
    fn test_release_foreign_handle_refused() {
        let mut a = Session::new(RecordingGuest::new());
        let mut b = Session::new(RecordingGuest::new());
        let mut options: Handle<Options> = a.construct(exports::OPTIONS_DEFAULT, &[]).unwrap();

        let result = b.release(&mut options);

        assert!(matches!(result, Err(BindingError::ForeignHandle { .. })));
        assert!(!options.is_released());
        assert!(b.runtime().calls.is_empty());
    }

    #[test]
    fn test_failed_destructor_still_marks_released() {
        let mut guest = RecordingGuest::new();
        guest.fail = Some(exports::OPTIONS_FREE);
        let mut session = Session::new(guest);
        let mut options: Handle<Options> = session.construct(exports::OPTIONS_DEFAULT, &[]).unwrap();

        assert!(session.release(&mut options).is_err());
        assert!(options.is_released());
        // Second release does not call the guest again
        session.release(&mut options).unwrap();
        assert_eq!(session.runtime().count(exports::OPTIONS_FREE), 1);
    }

    #[test]
    fn test_call_status_maps_non_zero() {
        let mut session = Session::new(RecordingGuest::new());

        let result = session.call_status(exports::TREE_CONVERT_TEXT, &[1, 2, 1]);

        assert!(matches!(
            result,
            Err(BindingError::GuestStatus {
                export: "__usvg_tree_convert_text",
                code: 32
            })
        ));
    }

    #[test]
    fn test_call_scalar_rejects_missing_result() {
        let mut session = Session::new(RecordingGuest::new());

        let result = session.call_scalar(exports::OPTIONS_FREE, &[16]);

        assert!(matches!(result, Err(BindingError::UnexpectedReturn { .. })));
    }

    #[test]
    fn test_guest_bytes_freed_when_callback_fails() {
        let mut session = Session::new(RecordingGuest::new());

        let result: Result<(), _> = session.with_guest_bytes(b"<svg/>", |_, ptr, len| {
            assert_ne!(ptr, 0);
            assert_eq!(len, 6);
            Err(BindingError::null_resource("tree", exports::TREE_FROM_DATA))
        });

        assert!(result.unwrap_err().is_null_resource());
        let dealloc = session
            .runtime()
            .calls
            .iter()
            .find(|(name, _)| name == exports::DEALLOC)
            .unwrap();
        assert_eq!(dealloc.1[1], 6);
    }

    #[test]
    fn test_empty_bytes_skip_allocation() {
        let mut session = Session::new(RecordingGuest::new());

        let seen = session
            .with_guest_bytes(&[], |_, ptr, len| Ok((ptr, len)))
            .unwrap();

        assert_eq!(seen, (0, 0));
        assert!(session.runtime().calls.is_empty());
    }
}
