//! The camera token: per-capture encrypted device authentication.
//!
//! A token carries its fields separately at the API boundary (`ciphertext`,
//! `nonce`, `auth_tag`, `table_id`, `key_index`). For clients that only
//! support a single opaque blob, a combined sealed form
//! `nonce(12) ‖ ciphertext ‖ tag(16)` is also produced and accepted; both
//! forms decode to the same triple.
//!
//! Tokens are ephemeral: one per capture, never persisted beyond validation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::cipher::{Ciphertext, TokenCipher};
use crate::error::CoreError;
use crate::hash::FingerprintHash;
use crate::keys::MasterKey;
use crate::types::{KeyIndex, TableId};

/// A 96-bit AEAD nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenNonce(pub [u8; 12]);

impl TokenNonce {
    /// Generate a fresh random nonce.
    ///
    /// Randomness per capture is what keeps `(table, index, nonce)` triples
    /// from repeating; the cipher itself does not police reuse.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

/// A 128-bit Poly1305 authentication tag.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTag(pub [u8; 16]);

impl AuthTag {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthTag({})", hex::encode(self.0))
    }
}

/// A per-capture authentication token.
///
/// Proves to the authority that the capture came from a registered device
/// without revealing which device (unlinkability) and without the authority
/// ever seeing the image hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraToken {
    /// Encrypted fingerprint hash (32 bytes of ciphertext).
    pub ciphertext: Ciphertext,
    /// AEAD nonce.
    pub nonce: TokenNonce,
    /// AEAD authentication tag.
    pub auth_tag: AuthTag,
    /// Which master key table encrypted this token.
    pub table_id: TableId,
    /// Which derived key within the table.
    pub key_index: KeyIndex,
}

impl CameraToken {
    /// Build a token on the capture side: derive the key at
    /// `(table_id, key_index)` and encrypt the device fingerprint under it.
    pub fn seal(
        master_key: &MasterKey,
        table_id: TableId,
        key_index: KeyIndex,
        keys_per_table: u32,
        nonce: TokenNonce,
        fingerprint: &FingerprintHash,
    ) -> Result<Self, CoreError> {
        let derived = master_key.derive(key_index, keys_per_table)?;
        let (ciphertext, auth_tag) =
            TokenCipher::encrypt(&derived, &nonce, table_id, key_index, fingerprint);
        Ok(Self {
            ciphertext,
            nonce,
            auth_tag,
            table_id,
            key_index,
        })
    }

    /// Encode the combined sealed form: `nonce ‖ ciphertext ‖ tag`.
    pub fn sealed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.ciphertext.as_bytes().len() + 16);
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(self.ciphertext.as_bytes());
        out.extend_from_slice(self.auth_tag.as_bytes());
        out
    }

    /// Decode the combined sealed form back into the separated fields.
    ///
    /// `table_id` and `key_index` travel outside the blob in both forms.
    pub fn from_sealed_bytes(
        blob: &[u8],
        table_id: TableId,
        key_index: KeyIndex,
    ) -> Result<Self, CoreError> {
        if blob.len() < 12 + 16 {
            return Err(CoreError::MalformedToken(format!(
                "sealed token too short: {} bytes",
                blob.len()
            )));
        }
        let (nonce_bytes, rest) = blob.split_at(12);
        let (ct_bytes, tag_bytes) = rest.split_at(rest.len() - 16);

        let mut nonce = [0u8; 12];
        nonce.copy_from_slice(nonce_bytes);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(tag_bytes);

        Ok(Self {
            ciphertext: Ciphertext::from_bytes(ct_bytes.to_vec()),
            nonce: TokenNonce(nonce),
            auth_tag: AuthTag(tag),
            table_id,
            key_index,
        })
    }
}
