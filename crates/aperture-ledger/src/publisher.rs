//! Root publication with unbounded exponential-backoff retry.
//!
//! A sealed batch stays `Sealed/Unpublished` until the external ledger
//! accepts its root. Transient failures retry forever with growing delay and
//! an operator-visible warning per attempt; a batch is never re-batched and
//! never silently dropped. Publication failures are isolated per batch and
//! never stall new submissions or validations.

use std::sync::Arc;
use std::time::Duration;

use aperture_core::BatchId;
use aperture_store::{BatchState, BatchStore, LedgerRef};

use crate::client::{LedgerClient, PublishError};
use crate::error::{LedgerError, Result};
use crate::ledger::SubmissionLedger;

/// Exponential backoff parameters for publish retries.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Cap on the delay between retries. The retry count itself is
    /// unbounded.
    pub max: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(300),
        }
    }
}

/// Publishes sealed batch roots to the external ledger.
pub struct Publisher {
    store: Arc<dyn BatchStore>,
    client: Arc<dyn LedgerClient>,
    ledger: Arc<SubmissionLedger>,
    backoff: BackoffConfig,
}

impl Publisher {
    /// Create a publisher.
    pub fn new(
        store: Arc<dyn BatchStore>,
        client: Arc<dyn LedgerClient>,
        ledger: Arc<SubmissionLedger>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            store,
            client,
            ledger,
            backoff,
        }
    }

    /// Publish one batch's root, retrying transient failures until the
    /// ledger accepts it.
    ///
    /// Idempotent: an already-published batch returns its existing reference.
    pub async fn publish(&self, batch_id: BatchId) -> Result<LedgerRef> {
        let batch = self
            .store
            .get_batch(batch_id)
            .await?
            .ok_or(aperture_store::StoreError::UnknownBatch(batch_id))?;

        if batch.state == BatchState::Published {
            if let Some(existing) = batch.ledger_ref {
                return Ok(existing);
            }
        }

        let mut delay = self.backoff.initial;
        let mut attempt = 1u32;
        loop {
            match self.client.post_root(batch_id, &batch.merkle_root).await {
                Ok(ledger_ref) => {
                    self.store.mark_published(batch_id, &ledger_ref).await?;
                    self.ledger.mark_published(&batch.leaf_hashes)?;
                    tracing::info!(
                        batch = %batch_id,
                        ledger_ref = %ledger_ref.as_str(),
                        "batch root published"
                    );
                    return Ok(ledger_ref);
                }
                Err(PublishError::Rejected(msg)) => {
                    // Same input cannot succeed on retry; surface immediately.
                    return Err(LedgerError::PublishRejected(msg));
                }
                Err(PublishError::Retryable(msg)) => {
                    tracing::warn!(
                        batch = %batch_id,
                        attempt,
                        error = %msg,
                        "ledger publish failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, self.backoff.max);
                    attempt += 1;
                }
            }
        }
    }

    /// Attempt every sealed-unpublished batch, oldest first.
    ///
    /// A failure is confined to its batch: the sweep records it and moves on
    /// to the next, so one rejected root cannot strand the batches behind
    /// it. Failed batches stay `Sealed` for the next sweep.
    pub async fn publish_all(&self) -> Result<PublishSweep> {
        let mut sweep = PublishSweep {
            published: Vec::new(),
            failed: Vec::new(),
        };
        for batch_id in self.store.unpublished().await? {
            match self.publish(batch_id).await {
                Ok(ledger_ref) => sweep.published.push(ledger_ref),
                Err(e) => {
                    tracing::error!(
                        batch = %batch_id,
                        error = %e,
                        "batch publication failed; batch stays sealed"
                    );
                    sweep.failed.push((batch_id, e));
                }
            }
        }
        Ok(sweep)
    }
}

/// Outcome of one sweep over the sealed-unpublished batches.
#[derive(Debug)]
pub struct PublishSweep {
    /// References for the batches the ledger accepted.
    pub published: Vec<LedgerRef>,
    /// Batches this sweep could not publish, each left `Sealed` in the store.
    pub failed: Vec<(BatchId, LedgerError)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::MerkleBatcher;
    use crate::ledger::{LedgerConfig, SubmissionLedger};
    use crate::submission::{ModificationLevel, Submission, SubmissionStatus};
    use aperture_core::{ImageHash, TransactionId};
    use aperture_merkle::MerkleRoot;
    use aperture_store::MemoryBatchStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Ledger stub that fails a configured number of times before accepting.
    struct FlakyLedger {
        failures_left: AtomicU32,
        roots: StdMutex<Vec<(LedgerRef, MerkleRoot)>>,
    }

    impl FlakyLedger {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(failures),
                roots: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerClient for FlakyLedger {
        async fn post_root(
            &self,
            batch_id: BatchId,
            root: &MerkleRoot,
        ) -> std::result::Result<LedgerRef, PublishError> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(PublishError::Retryable("ledger unreachable".into()));
            }
            let ledger_ref = LedgerRef::new(format!("block-{}", batch_id.0));
            self.roots.lock().unwrap().push((ledger_ref.clone(), *root));
            Ok(ledger_ref)
        }

        async fn fetch_root(
            &self,
            ledger_ref: &LedgerRef,
        ) -> std::result::Result<Option<MerkleRoot>, PublishError> {
            Ok(self
                .roots
                .lock()
                .unwrap()
                .iter()
                .find(|(r, _)| r == ledger_ref)
                .map(|(_, root)| *root))
        }
    }

    /// Ledger stub that permanently rejects one batch id and accepts the
    /// rest.
    struct PickyLedger {
        rejected: BatchId,
    }

    #[async_trait]
    impl LedgerClient for PickyLedger {
        async fn post_root(
            &self,
            batch_id: BatchId,
            _root: &MerkleRoot,
        ) -> std::result::Result<LedgerRef, PublishError> {
            if batch_id == self.rejected {
                return Err(PublishError::Rejected("root refused".into()));
            }
            Ok(LedgerRef::new(format!("block-{}", batch_id.0)))
        }

        async fn fetch_root(
            &self,
            _ledger_ref: &LedgerRef,
        ) -> std::result::Result<Option<MerkleRoot>, PublishError> {
            Ok(None)
        }
    }

    async fn sealed_setup(
        client: Arc<dyn LedgerClient>,
    ) -> (Arc<SubmissionLedger>, Arc<MemoryBatchStore>, Publisher, BatchId, Vec<ImageHash>) {
        let ledger = Arc::new(SubmissionLedger::new(LedgerConfig::default()));
        let store = Arc::new(MemoryBatchStore::new());
        let members: Vec<(Submission, bool)> = (0..3)
            .map(|i| {
                (
                    Submission::new(
                        ImageHash::hash(format!("img-{i}").as_bytes()),
                        ModificationLevel::Original,
                        None,
                        TransactionId::new("t1"),
                    ),
                    true,
                )
            })
            .collect();
        let hashes: Vec<ImageHash> = members.iter().map(|(s, _)| s.image_hash).collect();
        ledger.commit_transaction(members, 0).unwrap();

        let batcher = MerkleBatcher::new(ledger.clone(), store.clone());
        let batch_id = batcher.seal_now(0).await.unwrap().unwrap();

        let publisher = Publisher::new(
            store.clone(),
            client,
            ledger.clone(),
            BackoffConfig {
                initial: Duration::from_millis(1),
                max: Duration::from_millis(4),
            },
        );
        (ledger, store, publisher, batch_id, hashes)
    }

    #[tokio::test]
    async fn test_publish_first_try() {
        let client = Arc::new(FlakyLedger::new(0));
        let (ledger, store, publisher, batch_id, hashes) = sealed_setup(client).await;

        let ledger_ref = publisher.publish(batch_id).await.unwrap();
        let batch = store.get_batch(batch_id).await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::Published);
        assert_eq!(batch.ledger_ref, Some(ledger_ref));
        for hash in &hashes {
            assert_eq!(ledger.status_of(hash), Some(SubmissionStatus::Published));
        }
    }

    #[tokio::test]
    async fn test_publish_retries_until_accepted() {
        let client = Arc::new(FlakyLedger::new(4));
        let (_, store, publisher, batch_id, _) = sealed_setup(client).await;

        publisher.publish(batch_id).await.unwrap();
        let batch = store.get_batch(batch_id).await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::Published);
    }

    #[tokio::test]
    async fn test_publish_is_idempotent() {
        let client = Arc::new(FlakyLedger::new(0));
        let (_, _, publisher, batch_id, _) = sealed_setup(client).await;

        let first = publisher.publish(batch_id).await.unwrap();
        let second = publisher.publish(batch_id).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_publish_all_drains_unpublished() {
        let client = Arc::new(FlakyLedger::new(1));
        let (_, store, publisher, _, _) = sealed_setup(client).await;

        let sweep = publisher.publish_all().await.unwrap();
        assert_eq!(sweep.published.len(), 1);
        assert!(sweep.failed.is_empty());
        assert!(store.unpublished().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_batch_does_not_strand_later_batches() {
        let ledger = Arc::new(SubmissionLedger::new(LedgerConfig::default()));
        let store = Arc::new(MemoryBatchStore::new());
        let batcher = MerkleBatcher::new(ledger.clone(), store.clone());

        let mut batch_ids = Vec::new();
        for txn in ["t1", "t2"] {
            ledger
                .commit_transaction(
                    vec![(
                        Submission::new(
                            ImageHash::hash(txn.as_bytes()),
                            ModificationLevel::Original,
                            None,
                            TransactionId::new(txn),
                        ),
                        true,
                    )],
                    0,
                )
                .unwrap();
            batch_ids.push(batcher.seal_now(0).await.unwrap().unwrap());
        }

        let publisher = Publisher::new(
            store.clone(),
            Arc::new(PickyLedger {
                rejected: batch_ids[0],
            }),
            ledger.clone(),
            BackoffConfig {
                initial: Duration::from_millis(1),
                max: Duration::from_millis(4),
            },
        );

        let sweep = publisher.publish_all().await.unwrap();
        assert_eq!(sweep.published.len(), 1);
        assert_eq!(sweep.failed.len(), 1);
        assert_eq!(sweep.failed[0].0, batch_ids[0]);
        assert!(matches!(sweep.failed[0].1, LedgerError::PublishRejected(_)));

        // The accepted batch went through; only the rejected one remains.
        assert_eq!(store.unpublished().await.unwrap(), vec![batch_ids[0]]);
        let second = store.get_batch(batch_ids[1]).await.unwrap().unwrap();
        assert_eq!(second.state, BatchState::Published);
    }

    #[tokio::test]
    async fn test_publish_unknown_batch() {
        let client = Arc::new(FlakyLedger::new(0));
        let (_, _, publisher, _, _) = sealed_setup(client).await;
        let err = publisher.publish(BatchId(999)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Store(aperture_store::StoreError::UnknownBatch(BatchId(999)))
        ));
    }
}
