//! Deferred, non-preemptive finalization.
//!
//! Finalizers attach to collector-managed entities and run only when the
//! embedding drains the queue with [`api::process`], never inside the
//! collector's reclamation pass. Reclamation hands each destroyed entity's
//! finalizers to a process-wide FIFO queue as one batch; draining runs
//! batches in destruction order and, within a batch, finalizers in
//! definition order.

#[macro_use]
extern crate log;
#[macro_use]
extern crate probe;
#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod attach;
pub mod binding;
pub mod error;
pub mod finalize;
pub mod process;
pub mod queue;

pub use attach::{AttachmentTable, ObjectRef};
pub use binding::FinalizeBinding;
pub use error::FinalizeError;
pub use finalize::{FinalizableId, Finalizer};

lazy_static! {
    static ref BINDING: FinalizeBinding = FinalizeBinding::new();
}

/// The process-wide binding. Lives until process exit; never torn down
/// except through [`api::shutdown`].
pub fn binding() -> &'static FinalizeBinding {
    &BINDING
}
