//! # Aperture Merkle
//!
//! Merkle tree construction and inclusion-proof verification over batch
//! leaf hashes. Pure computation, no I/O.
//!
//! ## Tree Conventions (wire contract)
//!
//! Two implementations that disagree on any of these will disagree on roots,
//! so they are fixed here and covered by tests:
//!
//! - Leaves are the 32-byte image hashes as-is, in insertion order.
//! - Interior node = `blake3(0x01 ‖ left ‖ right)`. The `0x01` prefix
//!   domain-separates interior nodes from leaf values.
//! - An odd node at any level is paired with itself (duplicate-last padding).
//! - Proofs list siblings leaf→root, each tagged with the side the sibling
//!   occupies in its pair.

pub mod error;
pub mod proof;
pub mod tree;

pub use error::MerkleError;
pub use proof::{verify_proof, MerkleProof, ProofStep, SiblingSide, VerifyOutcome};
pub use tree::{MerkleRoot, MerkleTree};
