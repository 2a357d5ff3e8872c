//! Inclusion proofs and client-side verification.
//!
//! Verification is the trustless half of the protocol: the trusted root must
//! come from a source independent of the aggregator (the external ledger),
//! and a proof that fails to reconstruct it is a materially different event
//! from a proof that simply does not exist.

use serde::{Deserialize, Serialize};

use aperture_core::{BatchId, ImageHash};

use crate::tree::{hash_pair, MerkleRoot};

/// Which side of the pair the recorded sibling occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiblingSide {
    Left,
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    /// The sibling hash at this level.
    pub hash: [u8; 32],
    /// Where the sibling sits relative to the running hash.
    pub side: SiblingSide,
}

/// An inclusion proof: the minimal sibling path from one leaf to the root.
///
/// Immutable once produced alongside its sealed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// The leaf this proof covers.
    pub leaf_hash: ImageHash,
    /// Position of the leaf in the batch's insertion order.
    pub leaf_index: u64,
    /// Sibling hashes, leaf→root.
    pub siblings: Vec<ProofStep>,
    /// The batch this proof belongs to.
    pub batch_id: BatchId,
}

/// Outcome of recomputing a proof against a trusted root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The proof reconstructs the trusted root.
    Verified,
    /// The proof exists but does not reconstruct the trusted root:
    /// aggregator fraud or data corruption, not an ordinary miss.
    Mismatch,
}

/// Recompute the path from `image_hash` through the proof's siblings and
/// compare the candidate root against `trusted_root`.
pub fn verify_proof(
    image_hash: &ImageHash,
    proof: &MerkleProof,
    trusted_root: &MerkleRoot,
) -> VerifyOutcome {
    // A proof for a different leaf can never vouch for this hash.
    if proof.leaf_hash != *image_hash {
        return VerifyOutcome::Mismatch;
    }

    let mut running = image_hash.0;
    for step in &proof.siblings {
        running = match step.side {
            SiblingSide::Left => hash_pair(&step.hash, &running),
            SiblingSide::Right => hash_pair(&running, &step.hash),
        };
    }

    if running == *trusted_root.as_bytes() {
        VerifyOutcome::Verified
    } else {
        VerifyOutcome::Mismatch
    }
}
