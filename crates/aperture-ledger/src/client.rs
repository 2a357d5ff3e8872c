//! The external ledger interface.
//!
//! The core only posts a root and later reads it back; consensus and block
//! production live elsewhere. Implementations over real transports belong to
//! the deployment; tests use in-memory clients.

use async_trait::async_trait;
use thiserror::Error;

use aperture_core::BatchId;
use aperture_merkle::MerkleRoot;
use aperture_store::LedgerRef;

/// Publication failures, split by whether retrying can ever help.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Transient transport or consensus failure; the publisher retries.
    #[error("transient ledger error: {0}")]
    Retryable(String),

    /// The ledger rejected the root outright; retrying the same input
    /// cannot succeed.
    #[error("ledger rejected root: {0}")]
    Rejected(String),
}

/// Client surface of the external append-only ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Post a sealed batch's root for publication.
    async fn post_root(
        &self,
        batch_id: BatchId,
        root: &MerkleRoot,
    ) -> Result<LedgerRef, PublishError>;

    /// Read a published root back, independently of the aggregator.
    async fn fetch_root(&self, ledger_ref: &LedgerRef) -> Result<Option<MerkleRoot>, PublishError>;
}
