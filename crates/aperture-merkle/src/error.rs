//! Error types for Merkle batching.

use thiserror::Error;

/// Errors that can occur building trees or extracting proofs.
#[derive(Debug, Error)]
pub enum MerkleError {
    /// A batch must contain at least one leaf.
    #[error("cannot build a Merkle tree over an empty batch")]
    EmptyBatch,

    /// Requested proof for a leaf index the tree does not have.
    #[error("leaf index {index} out of range (leaf count: {leaf_count})")]
    LeafIndexOutOfRange { index: usize, leaf_count: usize },
}
