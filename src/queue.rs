//! The global FIFO of finalizer batches.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::finalize::Finalizer;

/// The ordered finalizers of one destroyed entity, queued as a single unit.
pub struct FinalizerBatch {
    finalizers: Vec<Finalizer>,
}

impl FinalizerBatch {
    pub(crate) fn new(finalizers: Vec<Finalizer>) -> FinalizerBatch {
        FinalizerBatch { finalizers }
    }

    pub fn len(&self) -> usize {
        self.finalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.finalizers.is_empty()
    }

    pub(crate) fn into_finalizers(self) -> Vec<Finalizer> {
        self.finalizers
    }
}

/// Batches from destroyed entities, in destruction order.
///
/// Pushed from the destruction-notification context, popped by the drain.
/// Batches come back in the exact order they were pushed.
/// If the lock ever becomes a bottleneck for the collector, replace it with
/// a lock-free list.
pub struct FinalizerQueue {
    batches: Mutex<VecDeque<FinalizerBatch>>,
}

impl FinalizerQueue {
    pub fn new() -> FinalizerQueue {
        FinalizerQueue {
            batches: Mutex::new(VecDeque::new()),
        }
    }

    /// Append a batch at the tail.
    ///
    /// Empty batches are ignored. When space for the new entry cannot be
    /// reserved the batch is dropped and logged instead of aborting the
    /// reclamation pass that is delivering it.
    pub fn push_batch(&self, batch: FinalizerBatch) {
        if batch.is_empty() {
            return;
        }
        let num_finalizers = batch.len();
        let mut batches = self.batches.lock().unwrap();
        if batches.try_reserve(1).is_err() {
            warn!(
                "dropping a batch of {} finalizers: queue allocation failed",
                num_finalizers
            );
            return;
        }
        batches.push_back(batch);
        let num_batches = batches.len();
        probe!(gc_finalize, push_batch, num_finalizers, num_batches);
        trace!(
            "queued a batch of {} finalizers ({} batches pending)",
            num_finalizers,
            num_batches
        );
    }

    /// Remove and return the head batch.
    pub fn pop_batch(&self) -> Option<FinalizerBatch> {
        let mut batches = self.batches.lock().unwrap();
        batches.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().unwrap().is_empty()
    }

    /// Drop every pending batch without running anything. Returns the number
    /// of batches discarded.
    pub(crate) fn discard_all(&self) -> usize {
        let mut batches = self.batches.lock().unwrap();
        let discarded = batches.len();
        batches.clear();
        discarded
    }
}

impl Default for FinalizerQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_come_back_in_push_order() {
        let queue = FinalizerQueue::new();
        let a = Finalizer::new(|| {});
        let b = Finalizer::new(|| {});
        queue.push_batch(FinalizerBatch::new(vec![a.clone()]));
        queue.push_batch(FinalizerBatch::new(vec![b.clone()]));

        let first = queue.pop_batch().unwrap().into_finalizers();
        assert!(first[0].same_callable(&a));
        let second = queue.pop_batch().unwrap().into_finalizers();
        assert!(second[0].same_callable(&b));
        assert!(queue.pop_batch().is_none());
    }

    #[test]
    fn empty_batches_are_never_queued() {
        let queue = FinalizerQueue::new();
        queue.push_batch(FinalizerBatch::new(Vec::new()));
        assert!(queue.is_empty());
    }

    #[test]
    fn discard_all_reports_the_count() {
        let queue = FinalizerQueue::new();
        queue.push_batch(FinalizerBatch::new(vec![Finalizer::new(|| {})]));
        queue.push_batch(FinalizerBatch::new(vec![Finalizer::new(|| {})]));
        assert_eq!(queue.discard_all(), 2);
        assert!(queue.is_empty());
    }
}
