//! Sealed batch and proof persistence.
//!
//! A batch is sealed by the batcher, stored together with its full proof
//! array, and later marked published once the external ledger accepts its
//! root. Readers either see a fully sealed batch with a complete proof set or
//! nothing; half-built trees are never observable through this interface.
//!
//! Each stored batch also carries a canonical CBOR encoding so independent
//! stores can compare records byte-for-byte.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use aperture_core::{BatchId, ImageHash};
use aperture_merkle::{MerkleProof, MerkleRoot};

use crate::error::{Result, StoreError};

/// Reference to a published root in the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRef(pub String);

impl LedgerRef {
    pub fn new(r: impl Into<String>) -> Self {
        Self(r.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Publication state of a sealed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    /// Sealed but not yet accepted by the external ledger.
    Sealed,
    /// Root accepted by the external ledger.
    Published,
}

/// A sealed batch: the ordered leaves, their root, and publication state.
///
/// Immutable once sealed except for acquiring its ledger reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    /// Leaves in insertion order; proof indices are positions in this
    /// sequence.
    pub leaf_hashes: Vec<ImageHash>,
    pub merkle_root: MerkleRoot,
    /// Seal time, Unix milliseconds.
    pub created_at: i64,
    pub ledger_ref: Option<LedgerRef>,
    pub state: BatchState,
}

/// Canonical CBOR encoding of a batch record.
pub fn canonical_batch_bytes(batch: &Batch) -> Result<Bytes> {
    let mut buf = Vec::new();
    ciborium::into_writer(batch, &mut buf)
        .map_err(|e| StoreError::EncodingError(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Decode a canonical batch record.
pub fn decode_batch_bytes(bytes: &[u8]) -> Result<Batch> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::EncodingError(e.to_string()))
}

/// Async persistence interface for sealed batches and their proofs.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Persist a sealed batch together with its complete proof array.
    ///
    /// Atomic: after this returns, every leaf's proof is findable. Sealing
    /// the same batch id twice is an error.
    async fn insert_sealed(&self, batch: &Batch, proofs: &[MerkleProof]) -> Result<()>;

    /// Get a batch by id.
    async fn get_batch(&self, batch_id: BatchId) -> Result<Option<Batch>>;

    /// O(1) proof lookup by leaf hash.
    async fn proof_for_leaf(&self, leaf: &ImageHash) -> Result<Option<MerkleProof>>;

    /// Record that the external ledger accepted this batch's root.
    async fn mark_published(&self, batch_id: BatchId, ledger_ref: &LedgerRef) -> Result<()>;

    /// All batches still awaiting publication, oldest first.
    async fn unpublished(&self) -> Result<Vec<BatchId>>;

    /// Allocate the next batch id.
    async fn next_batch_id(&self) -> Result<BatchId>;
}

struct StoredBatch {
    batch: Batch,
    canonical: Bytes,
    proofs: Vec<MerkleProof>,
}

/// In-memory batch store. Thread-safe via RwLock.
pub struct MemoryBatchStore {
    inner: RwLock<MemoryBatchStoreInner>,
}

struct MemoryBatchStoreInner {
    batches: HashMap<BatchId, StoredBatch>,
    /// leaf hash -> (batch, index into the proof array).
    leaf_index: HashMap<ImageHash, (BatchId, usize)>,
    next_id: u64,
}

impl MemoryBatchStore {
    /// Create an empty batch store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryBatchStoreInner {
                batches: HashMap::new(),
                leaf_index: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// The cached canonical bytes for a batch, if stored.
    pub fn canonical_bytes(&self, batch_id: BatchId) -> Option<Bytes> {
        let inner = self.inner.read().unwrap();
        inner.batches.get(&batch_id).map(|s| s.canonical.clone())
    }
}

impl Default for MemoryBatchStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchStore for MemoryBatchStore {
    async fn insert_sealed(&self, batch: &Batch, proofs: &[MerkleProof]) -> Result<()> {
        let canonical = canonical_batch_bytes(batch)?;
        let mut inner = self.inner.write().unwrap();

        if inner.batches.contains_key(&batch.batch_id) {
            return Err(StoreError::BatchExists(batch.batch_id));
        }

        for (i, proof) in proofs.iter().enumerate() {
            inner
                .leaf_index
                .insert(proof.leaf_hash, (batch.batch_id, i));
        }
        inner.batches.insert(
            batch.batch_id,
            StoredBatch {
                batch: batch.clone(),
                canonical,
                proofs: proofs.to_vec(),
            },
        );
        tracing::debug!(
            batch = %batch.batch_id,
            leaves = batch.leaf_hashes.len(),
            "sealed batch stored"
        );
        Ok(())
    }

    async fn get_batch(&self, batch_id: BatchId) -> Result<Option<Batch>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.batches.get(&batch_id).map(|s| s.batch.clone()))
    }

    async fn proof_for_leaf(&self, leaf: &ImageHash) -> Result<Option<MerkleProof>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.leaf_index.get(leaf).and_then(|(batch_id, i)| {
            inner
                .batches
                .get(batch_id)
                .and_then(|s| s.proofs.get(*i))
                .cloned()
        }))
    }

    async fn mark_published(&self, batch_id: BatchId, ledger_ref: &LedgerRef) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let stored = inner
            .batches
            .get_mut(&batch_id)
            .ok_or(StoreError::UnknownBatch(batch_id))?;
        stored.batch.ledger_ref = Some(ledger_ref.clone());
        stored.batch.state = BatchState::Published;
        stored.canonical = canonical_batch_bytes(&stored.batch)?;
        Ok(())
    }

    async fn unpublished(&self) -> Result<Vec<BatchId>> {
        let inner = self.inner.read().unwrap();
        let mut ids: Vec<BatchId> = inner
            .batches
            .values()
            .filter(|s| s.batch.state == BatchState::Sealed)
            .map(|s| s.batch.batch_id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn next_batch_id(&self) -> Result<BatchId> {
        let mut inner = self.inner.write().unwrap();
        let id = BatchId(inner.next_id);
        inner.next_id += 1;
        Ok(id)
    }
}
