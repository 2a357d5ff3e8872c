//! The Merkle batcher: drains the pending pool into sealed batches.
//!
//! Batch assembly is single-writer: the seal lock guarantees exactly one
//! drain of a given pool snapshot, so a submission can never land in two
//! sealed batches. Leaf order is the order submissions became validated and
//! is recorded in the sealed batch; proof indices depend on it.

use std::sync::Arc;

use aperture_core::{BatchId, ImageHash};
use aperture_merkle::MerkleTree;
use aperture_store::{Batch, BatchState, BatchStore};

use crate::error::Result;
use crate::ledger::SubmissionLedger;

/// Drains validated submissions into sealed, proof-carrying batches.
pub struct MerkleBatcher {
    ledger: Arc<SubmissionLedger>,
    store: Arc<dyn BatchStore>,
    /// Held across drain → seal → persist; enforces the single writer.
    seal_lock: tokio::sync::Mutex<()>,
}

impl MerkleBatcher {
    /// Create a batcher over a ledger and batch store.
    pub fn new(ledger: Arc<SubmissionLedger>, store: Arc<dyn BatchStore>) -> Self {
        Self {
            ledger,
            store,
            seal_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Seal a batch if either trigger has fired.
    pub async fn seal_if_due(&self, now: i64) -> Result<Option<BatchId>> {
        if !self.ledger.batch_due(now) {
            return Ok(None);
        }
        self.seal_now(now).await
    }

    /// Unconditionally drain the pool and seal whatever is pending.
    ///
    /// Returns `None` when the pool was empty. On a persist failure the
    /// snapshot goes back into the pool; nothing is dropped.
    pub async fn seal_now(&self, now: i64) -> Result<Option<BatchId>> {
        let _guard = self.seal_lock.lock().await;

        let entries = self.ledger.take_batch_snapshot();
        if entries.is_empty() {
            return Ok(None);
        }
        let leaves: Vec<ImageHash> = entries.iter().map(|(hash, _)| *hash).collect();

        let sealed = async {
            let batch_id = self.store.next_batch_id().await?;
            let tree = MerkleTree::build(&leaves)?;
            let batch = Batch {
                batch_id,
                leaf_hashes: leaves.clone(),
                merkle_root: tree.root(),
                created_at: now,
                ledger_ref: None,
                state: BatchState::Sealed,
            };
            let proofs = tree.proofs(batch_id);
            self.store.insert_sealed(&batch, &proofs).await?;
            Result::Ok(batch_id)
        }
        .await;

        match sealed {
            Ok(batch_id) => {
                self.ledger.mark_batched(&leaves)?;
                tracing::info!(
                    batch = %batch_id,
                    leaves = leaves.len(),
                    "batch sealed"
                );
                Ok(Some(batch_id))
            }
            Err(e) => {
                tracing::warn!(error = %e, "batch seal failed; snapshot restored");
                self.ledger.restore_pending(&entries);
                Err(e)
            }
        }
    }
}
