//! Hierarchical key derivation.
//!
//! Each master key table holds one 32-byte master key; per-capture token keys
//! are derived from it by index. The derivation is the interoperability
//! contract of the protocol and must match the published golden vectors
//! bit-for-bit:
//!
//! ```text
//! derived = HKDF-SHA256(salt = "aperture-token-key-v1",
//!                       ikm  = master_key,
//!                       info = key_index as 4-byte big-endian)
//! ```
//!
//! No randomness, no side effects. The same `(master_key, index)` pair yields
//! the same key in every implementation.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CoreError;
use crate::types::KeyIndex;

/// HKDF salt fixed by the wire contract.
pub const DERIVATION_SALT: &[u8] = b"aperture-token-key-v1";

/// A 32-byte table master key.
///
/// Provisioned once per table and immutable thereafter; rotation creates a
/// new table rather than mutating this one. Zeroed from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    key: [u8; 32],
}

impl MasterKey {
    /// Create from raw key material.
    pub const fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Generate a fresh master key from system randomness.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Get the raw bytes (sensitive operation; needed for provisioning
    /// checksums and secure-element storage).
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Derive the token key at `index`.
    ///
    /// `keys_per_table` is the deployment's configured index domain; an
    /// out-of-range index is a caller bug and fails with
    /// [`CoreError::InvalidIndex`].
    pub fn derive(&self, index: KeyIndex, keys_per_table: u32) -> Result<DerivedKey, CoreError> {
        if index.0 >= keys_per_table {
            return Err(CoreError::InvalidIndex {
                index: index.0,
                limit: keys_per_table,
            });
        }

        let hk = Hkdf::<Sha256>::new(Some(DERIVATION_SALT), &self.key);
        let mut okm = [0u8; 32];
        hk.expand(&index.to_be_bytes(), &mut okm)
            .expect("32-byte output within HKDF maximum");
        Ok(DerivedKey { key: okm })
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// A 256-bit derived token key. Zeroed from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; 32],
}

impl DerivedKey {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}
