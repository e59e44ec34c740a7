use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

use crate::attach::{AttachmentTable, ObjectRef};
use crate::error::FinalizeError;
use crate::finalize::{FinalizableId, FinalizableRegistry, Finalizer};
use crate::process::FinalizerProcessor;
use crate::queue::{FinalizerBatch, FinalizerQueue};

/// The finalization subsystem: entity registry, batch queue, and drain
/// controller, plus the embedding's attachment table.
///
/// One instance normally lives for the whole process (see `crate::binding`);
/// tests construct their own for isolation.
pub struct FinalizeBinding {
    pub registry: FinalizableRegistry,
    pub queue: FinalizerQueue,
    pub processor: FinalizerProcessor,
    attachments: OnceCell<Box<dyn AttachmentTable>>,
    alive: AtomicBool,
}

impl FinalizeBinding {
    pub fn new() -> FinalizeBinding {
        FinalizeBinding {
            registry: FinalizableRegistry::new(),
            queue: FinalizerQueue::new(),
            processor: FinalizerProcessor::new(),
            attachments: OnceCell::new(),
            alive: AtomicBool::new(true),
        }
    }

    /// Register the embedding's attachment table. Must happen once, before
    /// any object-keyed operation.
    pub fn register_attachments(&self, attachments: Box<dyn AttachmentTable>) {
        if self.attachments.set(attachments).is_err() {
            panic!("attachment table is already registered");
        }
    }

    fn attachments(&self) -> &dyn AttachmentTable {
        self.attachments
            .get()
            .expect("attachment table is not registered")
            .as_ref()
    }

    /// The entity for `object`: the object itself when its kind carries
    /// finalizers directly, the previously bound entity otherwise, or a
    /// fresh entity bound on first use.
    ///
    /// An entity bound here has its own lifetime. It may be reclaimed one or
    /// more collection cycles after `object` is, so its finalizers run
    /// eventually rather than promptly; embeddings that need both reclaimed
    /// together must run a full collection.
    pub fn finalizable_for(&self, object: ObjectRef) -> Result<FinalizableId, FinalizeError> {
        let attachments = self.attachments();
        if let Some(id) = attachments.as_finalizable(object) {
            return Ok(id);
        }
        if let Some(id) = attachments.lookup(object) {
            return Ok(id);
        }
        let id = self.registry.create(Some(object));
        if !attachments.bind(object, id) {
            self.registry.discard(id);
            return Err(FinalizeError::UnsupportedObject);
        }
        log::trace!("bound entity {:?} to {:?}", id, object);
        Ok(id)
    }

    /// Register `finalizer` on `object`, attaching an entity on first use
    /// when the object does not carry finalizers directly.
    pub fn define_finalizer(
        &self,
        object: ObjectRef,
        finalizer: Finalizer,
    ) -> Result<(), FinalizeError> {
        let id = self.finalizable_for(object)?;
        self.registry.define(id, finalizer)
    }

    /// Remove a previously registered finalizer from `object`.
    pub fn undefine_finalizer(
        &self,
        object: ObjectRef,
        finalizer: &Finalizer,
    ) -> Result<(), FinalizeError> {
        let id = self.finalizable_for(object)?;
        self.registry.undefine(id, finalizer)
    }

    /// Explicitly instantiate an entity with no host object, for objects
    /// whose own storage carries finalizers directly.
    pub fn create_finalizable(&self) -> FinalizableId {
        self.registry.create(None)
    }

    /// Destruction notification from the collector.
    ///
    /// Arrives at an unspecified point after the entity becomes unreachable,
    /// possibly from a context that permits no other computation. Moves the
    /// entity's finalizers into the queue as one batch and does nothing
    /// else; never fails, and tolerates duplicate notifications.
    pub fn notify_destroyed(&self, id: FinalizableId) {
        if !self.alive.load(Ordering::SeqCst) {
            return;
        }
        if let Some(finalizers) = self.registry.take_destroyed(id) {
            debug!("entity {:?} destroyed with {} finalizers", id, finalizers.len());
            self.queue.push_batch(FinalizerBatch::new(finalizers));
        }
    }

    /// Run every queued batch. See `FinalizerProcessor::process`.
    pub fn process(&self) -> Result<(), FinalizeError> {
        self.processor.process(&self.queue)
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Tear the subsystem down. Pending batches are discarded, not run, and
    /// destruction notifications arriving after this point are ignored;
    /// reclamation during embedding teardown must not touch the queue.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
        let discarded = self.queue.discard_all();
        if discarded > 0 {
            debug!("shutdown discarded {} pending batches", discarded);
        }
    }
}

impl Default for FinalizeBinding {
    fn default() -> Self {
        Self::new()
    }
}
