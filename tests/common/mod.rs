//! Toy host object model standing in for the embedding: an identity-keyed
//! side table over three object kinds (entity-backed, ordinary, immediate).
//! Tests drive destruction notifications by hand in place of a collector.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use gc_finalize::{AttachmentTable, FinalizableId, ObjectRef};

#[derive(Clone, Default)]
pub struct HostObjects {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    direct: Mutex<HashMap<ObjectRef, FinalizableId>>,
    bound: Mutex<HashMap<ObjectRef, FinalizableId>>,
    immediates: Mutex<HashSet<ObjectRef>>,
}

impl HostObjects {
    pub fn new() -> HostObjects {
        HostObjects::default()
    }

    /// Declare `object` to be backed by `entity` directly.
    pub fn add_direct(&self, object: ObjectRef, entity: FinalizableId) {
        self.inner.direct.lock().unwrap().insert(object, entity);
    }

    /// Declare `object` an immediate value that can carry no attachment.
    pub fn mark_immediate(&self, object: ObjectRef) {
        self.inner.immediates.lock().unwrap().insert(object);
    }

    /// The auxiliary entity bound to `object`, if resolution created one.
    pub fn bound_entity(&self, object: ObjectRef) -> Option<FinalizableId> {
        self.inner.bound.lock().unwrap().get(&object).copied()
    }
}

impl AttachmentTable for HostObjects {
    fn as_finalizable(&self, object: ObjectRef) -> Option<FinalizableId> {
        self.inner.direct.lock().unwrap().get(&object).copied()
    }

    fn lookup(&self, object: ObjectRef) -> Option<FinalizableId> {
        self.inner.bound.lock().unwrap().get(&object).copied()
    }

    fn bind(&self, object: ObjectRef, entity: FinalizableId) -> bool {
        if self.inner.immediates.lock().unwrap().contains(&object) {
            return false;
        }
        self.inner.bound.lock().unwrap().insert(object, entity);
        true
    }
}

pub fn object(raw: usize) -> ObjectRef {
    ObjectRef::from_raw(raw).unwrap()
}
