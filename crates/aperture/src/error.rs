//! Error types for the Aperture service.

use thiserror::Error;

use aperture_core::{BatchId, CoreError};
use aperture_ledger::{LedgerError, PublishError};
use aperture_merkle::MerkleError;
use aperture_store::StoreError;

/// Errors that can occur during Aperture operations.
#[derive(Debug, Error)]
pub enum ApertureError {
    /// Core primitive error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Ledger pipeline error.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Merkle error.
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    /// The external ledger could not be read.
    #[error("external ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// A capture submission carried no bundles.
    #[error("capture event carried no bundles")]
    EmptyCapture,

    /// A stored proof does not reconstruct the trusted root. Security
    /// relevant: aggregator fraud or data corruption, never an ordinary
    /// miss.
    #[error("proof mismatch for {image_hash} in {batch_id}")]
    ProofMismatch {
        image_hash: String,
        batch_id: BatchId,
    },
}

impl From<PublishError> for ApertureError {
    fn from(e: PublishError) -> Self {
        ApertureError::LedgerUnavailable(e.to_string())
    }
}

/// Result type for Aperture operations.
pub type Result<T> = std::result::Result<T, ApertureError>;
