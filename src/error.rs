//! Error types for the finalization subsystem.

use thiserror::Error;

/// Errors surfaced by finalizer registration and queue draining.
#[derive(Debug, Error)]
pub enum FinalizeError {
    /// The object's kind can never carry finalizers (immediates and other
    /// unboxed values).
    #[error("object does not support finalizers")]
    UnsupportedObject,

    /// The same callable is already registered on the entity.
    #[error("that finalizer is already defined on that object")]
    AlreadyDefined,

    /// The callable is not registered on the entity.
    #[error("that finalizer is not defined on that object")]
    NotDefined,

    /// The entity has been reclaimed and can no longer be addressed.
    #[error("finalizable entity has already been destroyed")]
    Destroyed,

    /// A drain is already running, either on another thread or further down
    /// the current call stack inside a finalizer.
    #[error("can not process finalizers from within a finalizer")]
    ReentrantProcess,

    /// A finalizer panicked during this drain. The rest of the queue is
    /// abandoned and the subsystem latches shut.
    #[error("error raised in a finalizer: {0}")]
    FinalizerPanicked(String),

    /// A finalizer panicked during an earlier drain; every call keeps
    /// failing until an administrative reset.
    #[error("error was raised in a finalizer, finalizers can not be processed anymore")]
    ProcessingDisabled,
}
