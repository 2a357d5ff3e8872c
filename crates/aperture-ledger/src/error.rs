//! Error types for the aggregation pipeline.

use thiserror::Error;

use crate::submission::SubmissionStatus;

/// Errors that can occur during submission grouping and batching.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Attempted a backward or skipping status transition.
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    /// A transaction commit contained submissions with differing ids.
    #[error("submissions in one commit must share a transaction id")]
    MixedTransaction,

    /// A transaction commit contained no submissions.
    #[error("empty transaction")]
    EmptyTransaction,

    /// This image hash was already submitted.
    #[error("duplicate submission: {0}")]
    DuplicateSubmission(String),

    /// Status update referenced a hash the ledger has never seen.
    #[error("unknown submission: {0}")]
    UnknownSubmission(String),

    /// The external ledger permanently rejected a root.
    #[error("ledger rejected root: {0}")]
    PublishRejected(String),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] aperture_store::StoreError),

    /// Tree construction failed.
    #[error("merkle error: {0}")]
    Merkle(#[from] aperture_merkle::MerkleError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
