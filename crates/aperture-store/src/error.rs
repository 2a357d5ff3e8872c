//! Error types for Aperture storage.

use thiserror::Error;

use aperture_core::{BatchId, TableId};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No master key table with this id is provisioned.
    #[error("unknown key table: {0}")]
    UnknownTable(TableId),

    /// Key material failed its integrity check. Fatal at load time.
    #[error("corrupt key table data: {0}")]
    CorruptTableData(String),

    /// A device with this fingerprint is already registered.
    #[error("device already registered: {0}")]
    DuplicateDevice(String),

    /// A batch with this id has already been sealed.
    #[error("batch already exists: {0}")]
    BatchExists(BatchId),

    /// No batch with this id.
    #[error("unknown batch: {0}")]
    UnknownBatch(BatchId),

    /// Canonical record encoding or decoding failed.
    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
