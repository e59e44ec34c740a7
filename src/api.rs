//! Entry points over the process-wide binding.
//!
//! Embeddings that need isolated instances use `FinalizeBinding` directly;
//! everything here delegates to `crate::binding()`.

use crate::attach::{AttachmentTable, ObjectRef};
use crate::error::FinalizeError;
use crate::finalize::{FinalizableId, Finalizer};

/// Initialize the process-wide binding with the embedding's attachment
/// table. Call once during embedding startup, before anything else here.
pub fn init_binding(attachments: Box<dyn AttachmentTable>) {
    let _ = env_logger::builder().try_init();
    crate::binding().register_attachments(attachments);
    debug!("finalization binding initialized");
}

/// Register `finalizer` on `object`, attaching an auxiliary entity on first
/// use when the object does not carry finalizers directly.
pub fn define_finalizer(object: ObjectRef, finalizer: Finalizer) -> Result<(), FinalizeError> {
    crate::binding().define_finalizer(object, finalizer)
}

/// Remove a previously registered finalizer from `object`.
pub fn undefine_finalizer(object: ObjectRef, finalizer: &Finalizer) -> Result<(), FinalizeError> {
    crate::binding().undefine_finalizer(object, finalizer)
}

/// Run the finalizers of every entity destroyed since the last drain.
pub fn process() -> Result<(), FinalizeError> {
    crate::binding().process()
}

/// Instantiate an entity for an object whose storage carries finalizers
/// directly.
pub fn create_finalizable() -> FinalizableId {
    crate::binding().create_finalizable()
}

/// Collector-facing destruction notification for the process-wide binding.
pub fn notify_destroyed(entity: FinalizableId) {
    crate::binding().notify_destroyed(entity)
}

/// Discard pending work and ignore destruction notifications from here on.
pub fn shutdown() {
    crate::binding().shutdown()
}
