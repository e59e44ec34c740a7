//! Finalizable entities and the registry that owns them.
//!
//! An entity holds an ordered list of finalizers. When the collector
//! reclaims it, the destruction notification moves that list into the global
//! queue as one batch; the entity itself is gone from the registry after
//! that and can never be addressed again.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::attach::ObjectRef;
use crate::error::FinalizeError;

/// A zero-argument callback run some time after its owning entity has been
/// reclaimed.
///
/// Cloning shares the underlying callable, so clones compare as the same
/// finalizer. Two independently constructed finalizers are never the same,
/// even when their effects are identical.
#[derive(Clone)]
pub struct Finalizer(Arc<dyn Fn() + Send + Sync + 'static>);

impl Finalizer {
    pub fn new<F>(f: F) -> Finalizer
    where
        F: Fn() + Send + Sync + 'static,
    {
        Finalizer(Arc::new(f))
    }

    /// Identity, not equivalence. Compares the data address of the shared
    /// callable only; vtable addresses are not stable across codegen units.
    pub fn same_callable(&self, other: &Finalizer) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.0) as *const (),
            Arc::as_ptr(&other.0) as *const (),
        )
    }

    pub(crate) fn invoke(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Finalizer({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Handle of a live finalizable entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FinalizableId(u64);

/// One finalizable entity: the ordered finalizer list and an identity-only
/// back-reference to the host object it was attached to, if any.
///
/// The list stays `None` until the first registration, so entities nobody
/// ever touched are distinguishable from entities whose list went back to
/// empty. Neither produces queue traffic on destruction.
struct Finalizable {
    host: Option<ObjectRef>,
    finalizers: Option<Vec<Finalizer>>,
}

/// Owns every live entity.
///
/// Registration runs on mutator threads while destruction notifications
/// arrive from the collector, so everything sits behind one lock.
pub struct FinalizableRegistry {
    entities: Mutex<HashMap<FinalizableId, Finalizable>>,
    next_id: AtomicU64,
}

impl FinalizableRegistry {
    pub fn new() -> FinalizableRegistry {
        FinalizableRegistry {
            entities: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create(&self, host: Option<ObjectRef>) -> FinalizableId {
        let id = FinalizableId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut entities = self.entities.lock().unwrap();
        entities.insert(
            id,
            Finalizable {
                host,
                finalizers: None,
            },
        );
        id
    }

    /// Drop an entity that was created but never exposed (its bind was
    /// rejected).
    pub(crate) fn discard(&self, id: FinalizableId) {
        let mut entities = self.entities.lock().unwrap();
        entities.remove(&id);
    }

    /// Register `finalizer` at the end of the entity's list.
    pub fn define(&self, id: FinalizableId, finalizer: Finalizer) -> Result<(), FinalizeError> {
        let mut entities = self.entities.lock().unwrap();
        let entity = entities.get_mut(&id).ok_or(FinalizeError::Destroyed)?;
        let finalizers = entity.finalizers.get_or_insert_with(Vec::new);
        if finalizers.iter().any(|f| f.same_callable(&finalizer)) {
            return Err(FinalizeError::AlreadyDefined);
        }
        finalizers.push(finalizer);
        Ok(())
    }

    /// Remove `finalizer` from the entity's list. Removal is by identity;
    /// the order of the remaining finalizers is preserved.
    pub fn undefine(&self, id: FinalizableId, finalizer: &Finalizer) -> Result<(), FinalizeError> {
        let mut entities = self.entities.lock().unwrap();
        let entity = entities.get_mut(&id).ok_or(FinalizeError::Destroyed)?;
        let finalizers = entity.finalizers.get_or_insert_with(Vec::new);
        let before = finalizers.len();
        finalizers.retain(|f| !f.same_callable(finalizer));
        if finalizers.len() == before {
            return Err(FinalizeError::NotDefined);
        }
        Ok(())
    }

    /// The host object the entity was attached to, while the entity is live.
    pub fn host_of(&self, id: FinalizableId) -> Option<ObjectRef> {
        let entities = self.entities.lock().unwrap();
        entities.get(&id).and_then(|entity| entity.host)
    }

    pub fn is_live(&self, id: FinalizableId) -> bool {
        self.entities.lock().unwrap().contains_key(&id)
    }

    /// Remove the entity and hand back its finalizers, oldest first.
    ///
    /// Returns `None` for entities with no finalizers and for ids already
    /// taken, so a destruction notification delivered twice is a no-op.
    pub(crate) fn take_destroyed(&self, id: FinalizableId) -> Option<Vec<Finalizer>> {
        let mut entities = self.entities.lock().unwrap();
        let entity = entities.remove(&id)?;
        match entity.finalizers {
            Some(finalizers) if !finalizers.is_empty() => Some(finalizers),
            _ => None,
        }
    }
}

impl Default for FinalizableRegistry {
    fn default() -> Self {
        Self::new()
    }
}
