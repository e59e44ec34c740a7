//! Identity handles for host objects and the side-table seam used to attach
//! finalizable entities to objects that do not carry them directly.

use std::fmt;
use std::num::NonZeroUsize;

use crate::finalize::FinalizableId;

/// Identity handle for a host-language object.
///
/// The embedding chooses the raw value (an address, a tagged handle, an
/// index); the subsystem only compares and hashes it. Holding an `ObjectRef`
/// does not keep the object alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(NonZeroUsize);

impl ObjectRef {
    /// `None` for zero, which is reserved as the null handle.
    pub fn from_raw(raw: usize) -> Option<ObjectRef> {
        NonZeroUsize::new(raw).map(ObjectRef)
    }

    pub fn to_raw(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.0.get())
    }
}

/// The identity-keyed side table the embedding maintains so that ordinary
/// objects can carry finalizers through an auxiliary entity.
///
/// One entity per object: `bind` is called at most once per object, and
/// `lookup` returns that entity on every later resolution.
pub trait AttachmentTable: Send + Sync {
    /// The entity the object's own storage is, for object kinds that carry
    /// finalizers directly.
    fn as_finalizable(&self, object: ObjectRef) -> Option<FinalizableId>;

    /// The entity previously bound to `object`, if any.
    fn lookup(&self, object: ObjectRef) -> Option<FinalizableId>;

    /// Bind a freshly created entity to `object`. Returns `false` when the
    /// object's kind cannot carry an auxiliary attachment; the caller
    /// discards the entity.
    fn bind(&self, object: ObjectRef, entity: FinalizableId) -> bool;
}
