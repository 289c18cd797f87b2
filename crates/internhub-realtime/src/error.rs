//! Error types for the realtime layer.

/// Errors that can occur when talking to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    /// The notifier task has stopped (shut down or panicked).
    #[error("notifier is not running")]
    Unavailable,

    /// A subscription must name at least one collection.
    #[error("subscription names no collections")]
    NoCollections,
}
