//! The drain controller.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use atomic_refcell::AtomicRefCell;

use crate::error::FinalizeError;
use crate::queue::FinalizerQueue;

/// `Latched` is terminal; only an administrative reset leaves it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum DrainPhase {
    Idle,
    Running,
    Latched,
}

/// Runs queued finalizers, one drain at a time.
///
/// A drain pops batches in destruction order and invokes each batch's
/// finalizers in definition order, so the total order is deterministic for a
/// fixed registration and destruction history. A panic escaping any
/// finalizer latches the processor permanently: the rest of the failing
/// batch and everything still queued are abandoned, and every later
/// `process` call fails until `reset`.
pub struct FinalizerProcessor {
    phase: Mutex<DrainPhase>,
    // Written once when latching, by the one thread that was draining.
    failure: AtomicRefCell<Option<String>>,
}

impl FinalizerProcessor {
    pub fn new() -> FinalizerProcessor {
        FinalizerProcessor {
            phase: Mutex::new(DrainPhase::Idle),
            failure: AtomicRefCell::new(None),
        }
    }

    /// Pop and run every queued batch.
    ///
    /// Fails with `ReentrantProcess` while a drain is already running
    /// (including from inside a finalizer) and with `ProcessingDisabled`
    /// on every call after a finalizer has panicked.
    pub fn process(&self, queue: &FinalizerQueue) -> Result<(), FinalizeError> {
        {
            let mut phase = self.phase.lock().unwrap();
            match *phase {
                DrainPhase::Latched => return Err(FinalizeError::ProcessingDisabled),
                DrainPhase::Running => return Err(FinalizeError::ReentrantProcess),
                DrainPhase::Idle => *phase = DrainPhase::Running,
            }
        }
        // The phase lock is not held while finalizers run, so a reentrant
        // call observes Running instead of deadlocking.

        let mut num_batches = 0usize;
        let mut num_invoked = 0usize;
        let outcome = 'drain: loop {
            let batch = match queue.pop_batch() {
                Some(batch) => batch,
                None => break 'drain Ok(()),
            };
            num_batches += 1;
            for finalizer in batch.into_finalizers() {
                num_invoked += 1;
                trace!("invoking finalizer {:?}", finalizer);
                let invoked = panic::catch_unwind(AssertUnwindSafe(|| finalizer.invoke()));
                if let Err(payload) = invoked {
                    break 'drain Err(panic_message(payload.as_ref()));
                }
            }
        };

        probe!(gc_finalize, process, num_batches, num_invoked);

        let mut phase = self.phase.lock().unwrap();
        match outcome {
            Ok(()) => {
                debug!(
                    "processed {} finalizers from {} batches",
                    num_invoked, num_batches
                );
                *phase = DrainPhase::Idle;
                Ok(())
            }
            Err(cause) => {
                warn!("finalizer panicked, finalizer processing is disabled: {}", cause);
                *self.failure.borrow_mut() = Some(cause.clone());
                *phase = DrainPhase::Latched;
                Err(FinalizeError::FinalizerPanicked(cause))
            }
        }
    }

    /// The recorded cause of the latch, once a finalizer has panicked.
    pub fn failure(&self) -> Option<String> {
        self.failure.borrow().clone()
    }

    /// Administrative escape hatch for tests and recovery tooling; normal
    /// operation never calls this.
    ///
    /// Only acts when latched: discards every pending batch (the partially
    /// run batch must not be resumed), clears the recorded cause, and
    /// returns to idle.
    pub fn reset(&self, queue: &FinalizerQueue) {
        let mut phase = self.phase.lock().unwrap();
        if *phase != DrainPhase::Latched {
            return;
        }
        let discarded = queue.discard_all();
        *self.failure.borrow_mut() = None;
        *phase = DrainPhase::Idle;
        debug!("finalizer processing reset, {} batches discarded", discarded);
    }
}

impl Default for FinalizerProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
