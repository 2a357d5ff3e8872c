//! Binary Merkle tree built bottom-up over batch leaves.

use serde::{Deserialize, Serialize};
use std::fmt;

use aperture_core::{BatchId, ImageHash};

use crate::error::MerkleError;
use crate::proof::{MerkleProof, ProofStep, SiblingSide};

/// Domain separator for interior nodes.
const NODE_PREFIX: u8 = 0x01;

/// A 32-byte Merkle root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerkleRoot(pub [u8; 32]);

impl MerkleRoot {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleRoot({})", &self.to_hex()[..16])
    }
}

/// Hash two sibling nodes into their parent.
pub(crate) fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}

/// A fully built Merkle tree, retaining every level for proof extraction.
pub struct MerkleTree {
    /// `levels[0]` is the leaf level; the last level has exactly one node.
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree over an ordered, non-empty leaf sequence.
    pub fn build(leaves: &[ImageHash]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyBatch);
        }

        let mut levels: Vec<Vec<[u8; 32]>> = vec![leaves.iter().map(|h| h.0).collect()];

        while levels.last().expect("at least one level").len() > 1 {
            let current = levels.last().expect("at least one level");
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for pair in current.chunks(2) {
                // Odd node at the end of a level pairs with itself.
                let right = pair.get(1).unwrap_or(&pair[0]);
                next.push(hash_pair(&pair[0], right));
            }
            levels.push(next);
        }

        Ok(Self { levels })
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The root of the tree.
    pub fn root(&self) -> MerkleRoot {
        MerkleRoot(
            *self
                .levels
                .last()
                .expect("tree always has a root level")
                .first()
                .expect("root level has one node"),
        )
    }

    /// Extract the inclusion proof for one leaf.
    ///
    /// Siblings are listed leaf→root. At each level the recorded sibling is
    /// the node this leaf's running hash pairs with; for an odd trailing node
    /// the sibling is the node itself.
    pub fn proof(&self, leaf_index: usize, batch_id: BatchId) -> Result<MerkleProof, MerkleError> {
        let leaf_count = self.leaf_count();
        if leaf_index >= leaf_count {
            return Err(MerkleError::LeafIndexOutOfRange {
                index: leaf_index,
                leaf_count,
            });
        }

        let mut siblings = Vec::with_capacity(self.levels.len() - 1);
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_index, side) = if index % 2 == 0 {
                // Right sibling; a trailing odd node duplicates itself.
                (usize::min(index + 1, level.len() - 1), SiblingSide::Right)
            } else {
                (index - 1, SiblingSide::Left)
            };
            siblings.push(ProofStep {
                hash: level[sibling_index],
                side,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            leaf_hash: ImageHash(self.levels[0][leaf_index]),
            leaf_index: leaf_index as u64,
            siblings,
            batch_id,
        })
    }

    /// Extract proofs for every leaf, in leaf order.
    pub fn proofs(&self, batch_id: BatchId) -> Vec<MerkleProof> {
        (0..self.leaf_count())
            .map(|i| {
                self.proof(i, batch_id)
                    .expect("index in range by construction")
            })
            .collect()
    }
}
