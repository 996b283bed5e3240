//! Shared machinery behind every math type: the ownership tri-state and the access gates.

use std::{cell::RefCell, error::Error, fmt, rc::Rc};

use crate::registry::{CallbackRegistry, CallbackToken, HostRef};

/// Largest element count of any view shape (a 4×4 matrix).
pub(crate) const MAX_ELEMS: usize = 16;

/// Flat `f32` storage owned by a host object that views can wrap.
///
/// The host keeps one handle and hands clones to [wrapping](crate::Vector::wrapping)
/// constructors; a wrapped view then reads from and writes through the shared storage
/// directly. Dropping a view only drops its handle — the storage lives until the last
/// holder is gone.
#[derive(Clone)]
pub struct SharedBuffer {
    data: Rc<RefCell<Box<[f32]>>>,
}

impl SharedBuffer {
    /// Creates shared storage initialized with a copy of `values`.
    pub fn new(values: &[f32]) -> Self {
        Self {
            data: Rc::new(RefCell::new(values.into())),
        }
    }

    /// Number of floats in the storage.
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies out the current contents.
    pub fn snapshot(&self) -> Vec<f32> {
        self.data.borrow().to_vec()
    }

    /// Host-side mutation of the underlying storage.
    pub fn update(&self, f: impl FnOnce(&mut [f32])) {
        f(&mut self.data.borrow_mut());
    }

    fn read_into(&self, start: usize, out: &mut [f32]) {
        out.copy_from_slice(&self.data.borrow()[start..start + out.len()]);
    }

    fn write_from(&self, start: usize, vals: &[f32]) {
        self.data.borrow_mut()[start..start + vals.len()].copy_from_slice(vals);
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedBuffer")
            .field(&*self.data.borrow())
            .finish()
    }
}

/// The host entity backing a view no longer exists.
///
/// Raised by the access gates when a proxied view's callback refuses a read or a write.
/// The view object itself stays inspectable (shape, ownership tag, owner), but its numeric
/// contents must not be trusted after this error. Recovery — rebinding to a new host — is
/// the caller's responsibility; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidatedView {
    kind: &'static str,
}

impl InvalidatedView {
    /// Name of the math type whose access was refused (`"Vector"`, `"Matrix"`, ...).
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for InvalidatedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} user has become invalid", self.kind)
    }
}

impl Error for InvalidatedView {}

enum Storage {
    /// Private buffer, freed exactly once when the view is dropped.
    Owned(Box<[f32]>),
    /// Region of a host-owned buffer. Never freed by the view.
    Wrapped {
        buf: SharedBuffer,
        start: usize,
        owner: Option<HostRef>,
    },
    /// No buffer at all; every access goes through the registered bundle.
    Proxied {
        registry: Rc<CallbackRegistry>,
        host: HostRef,
        token: CallbackToken,
        subtype: u8,
    },
}

/// Storage, shape and access gates shared by every math type.
///
/// Exactly one of the three [`Storage`] states holds at any time. Every reading or mutating
/// operation on the owning math type funnels through one of the `try_*` gates below, so the
/// host is consulted before each access, not just at construction time.
pub(crate) struct ViewData {
    kind: &'static str,
    len: usize,
    storage: Storage,
}

impl ViewData {
    pub fn owned(kind: &'static str, values: &[f32]) -> Self {
        Self {
            kind,
            len: values.len(),
            storage: Storage::Owned(values.into()),
        }
    }

    /// Callers validate `start + len <= buf.len()` before constructing.
    pub fn wrapped(
        kind: &'static str,
        buf: SharedBuffer,
        start: usize,
        len: usize,
        owner: Option<HostRef>,
    ) -> Self {
        debug_assert!(start + len <= buf.len());
        Self {
            kind,
            len,
            storage: Storage::Wrapped { buf, start, owner },
        }
    }

    pub fn proxied(
        kind: &'static str,
        registry: Rc<CallbackRegistry>,
        token: CallbackToken,
        host: HostRef,
        subtype: u8,
        len: usize,
    ) -> Self {
        Self {
            kind,
            len,
            storage: Storage::Proxied {
                registry,
                host,
                token,
                subtype,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this view is backed by foreign memory (wrapped, non-owning).
    pub fn is_wrapped(&self) -> bool {
        matches!(self.storage, Storage::Wrapped { .. })
    }

    /// The host back-reference, if any.
    pub fn owner(&self) -> Option<HostRef> {
        match &self.storage {
            Storage::Owned(_) => None,
            Storage::Wrapped { owner, .. } => owner.clone(),
            Storage::Proxied { host, .. } => Some(host.clone()),
        }
    }

    fn invalidated(&self) -> InvalidatedView {
        log::trace!("{} host refused access", self.kind);
        InvalidatedView { kind: self.kind }
    }

    /// Read gate: fetches the current elements into `out`.
    pub fn try_read(&self, out: &mut [f32]) -> Result<(), InvalidatedView> {
        debug_assert_eq!(out.len(), self.len);
        match &self.storage {
            Storage::Owned(buf) => out.copy_from_slice(buf),
            Storage::Wrapped { buf, start, .. } => buf.read_into(*start, out),
            Storage::Proxied {
                registry,
                host,
                token,
                subtype,
            } => {
                if !registry.resolve(*token).get(host.as_ref(), *subtype, out) {
                    return Err(self.invalidated());
                }
            }
        }
        Ok(())
    }

    /// Write gate: stores `vals` as the new value.
    ///
    /// A refused write means the mutation did not happen from the host's perspective; the
    /// host value stays authoritative.
    pub fn try_write(&mut self, vals: &[f32]) -> Result<(), InvalidatedView> {
        debug_assert_eq!(vals.len(), self.len);
        match &mut self.storage {
            Storage::Owned(buf) => buf.copy_from_slice(vals),
            Storage::Wrapped { buf, start, .. } => buf.write_from(*start, vals),
            Storage::Proxied {
                registry,
                host,
                token,
                subtype,
            } => {
                if !registry.resolve(*token).set(host.as_ref(), *subtype, vals) {
                    return Err(self.invalidated());
                }
            }
        }
        Ok(())
    }

    /// Index-scoped read gate; avoids round-tripping the whole buffer for proxied views.
    pub fn try_read_index(&self, index: usize) -> Result<f32, InvalidatedView> {
        debug_assert!(index < self.len);
        match &self.storage {
            Storage::Owned(buf) => Ok(buf[index]),
            Storage::Wrapped { buf, start, .. } => {
                let mut one = [0.0];
                buf.read_into(start + index, &mut one);
                Ok(one[0])
            }
            Storage::Proxied {
                registry,
                host,
                token,
                subtype,
            } => {
                // Marshalling area for this one operation; only `[index]` is meaningful.
                let mut scratch = [0.0; MAX_ELEMS];
                let scratch = &mut scratch[..self.len];
                if !registry
                    .resolve(*token)
                    .get_index(host.as_ref(), *subtype, scratch, index)
                {
                    return Err(self.invalidated());
                }
                Ok(scratch[index])
            }
        }
    }

    /// Index-scoped write gate.
    pub fn try_write_index(&mut self, index: usize, value: f32) -> Result<(), InvalidatedView> {
        debug_assert!(index < self.len);
        match &mut self.storage {
            Storage::Owned(buf) => buf[index] = value,
            Storage::Wrapped { buf, start, .. } => buf.write_from(*start + index, &[value]),
            Storage::Proxied {
                registry,
                host,
                token,
                subtype,
            } => {
                let mut scratch = [0.0; MAX_ELEMS];
                scratch[index] = value;
                if !registry.resolve(*token).set_index(
                    host.as_ref(),
                    *subtype,
                    &scratch[..self.len],
                    index,
                ) {
                    return Err(self.invalidated());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_roundtrip() {
        let mut data = ViewData::owned("Vector", &[1.0, 2.0, 3.0]);
        let mut out = [0.0; 3];
        data.try_read(&mut out).unwrap();
        assert_eq!(out, [1.0, 2.0, 3.0]);

        data.try_write(&[4.0, 5.0, 6.0]).unwrap();
        assert_eq!(data.try_read_index(1).unwrap(), 5.0);
        data.try_write_index(0, 9.0).unwrap();
        data.try_read(&mut out).unwrap();
        assert_eq!(out, [9.0, 5.0, 6.0]);
        assert!(!data.is_wrapped());
        assert!(data.owner().is_none());
    }

    #[test]
    fn wrapped_views_share_the_host_buffer() {
        let buf = SharedBuffer::new(&[0.0; 6]);
        let mut view = ViewData::wrapped("Vector", buf.clone(), 2, 3, None);
        assert!(view.is_wrapped());

        view.try_write(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(buf.snapshot(), [0.0, 0.0, 1.0, 2.0, 3.0, 0.0]);

        // Host-side mutation is immediately visible to the view.
        buf.update(|data| data[3] = 7.5);
        assert_eq!(view.try_read_index(1).unwrap(), 7.5);

        // Dropping the view leaves the host storage untouched.
        drop(view);
        assert_eq!(buf.snapshot(), [0.0, 0.0, 1.0, 7.5, 3.0, 0.0]);
    }

    #[test]
    fn invalidated_view_message() {
        let err = InvalidatedView { kind: "Quaternion" };
        assert_eq!(err.to_string(), "Quaternion user has become invalid");
        assert_eq!(err.kind(), "Quaternion");
    }
}
