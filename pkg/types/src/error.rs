//! Error taxonomy for the lease lifecycle.

use thiserror::Error;

/// Top-level error type for publish, probe-triggered rebuild, and
/// record-update operations.
#[derive(Error, Debug)]
pub enum LeaseError {
    /// No lease exists for the given id.
    #[error("lease not found")]
    NotFound,

    /// A probe or provider call timed out or could not reach its target.
    /// Retryable as-is.
    #[error("transient network failure: {0}")]
    TransientNetwork(String),

    /// The environment provider rejected a create/configure call.
    /// Retryable with backoff.
    #[error("provider failure: {0}")]
    Provider(String),

    /// Writing one artifact file into a fresh environment failed.
    /// Names the path so the caller can retry deterministically.
    #[error("failed to write {path} into environment: {reason}")]
    FileWrite { path: String, reason: String },

    /// The stored record cannot support the requested operation,
    /// e.g. a rebuild was attempted on a record without an artifact.
    /// Terminal: surfaced as "cannot auto-recover, please recreate".
    #[error("record inconsistency: {0}")]
    RecordInconsistency(String),

    /// The lease store itself failed.
    #[error("lease store failure: {0}")]
    Store(String),
}

/// Result type alias for lease operations.
pub type Result<T> = std::result::Result<T, LeaseError>;
