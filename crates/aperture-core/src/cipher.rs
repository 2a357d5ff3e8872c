//! AEAD token cipher.
//!
//! ChaCha20-Poly1305 with a 256-bit derived key, 96-bit nonce, and 128-bit
//! tag over the fixed 32-byte fingerprint plaintext. The token's claimed
//! coordinates `table_id (4B BE) ‖ key_index (4B BE)` are bound as associated
//! data on both encrypt and decrypt, so a token replayed under different
//! coordinates fails authentication. This binding is part of the wire format.
//!
//! Decryption fails closed: any corruption of ciphertext, tag, nonce, or
//! coordinates yields [`CoreError::AuthenticationFailure`], never a garbage
//! plaintext.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::hash::FingerprintHash;
use crate::keys::DerivedKey;
use crate::token::{AuthTag, TokenNonce};
use crate::types::{KeyIndex, TableId};

/// Token ciphertext (same length as the 32-byte plaintext; the tag is
/// carried separately).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(Vec<u8>);

impl Ciphertext {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({})", hex::encode(&self.0))
    }
}

/// Stateless AEAD encrypt/decrypt over the fixed-size fingerprint plaintext.
pub struct TokenCipher;

impl TokenCipher {
    /// Encrypt a fingerprint hash under a derived key.
    ///
    /// The caller supplies the nonce and must never reuse a
    /// `(table, index, nonce)` triple for two different fingerprints.
    pub fn encrypt(
        key: &DerivedKey,
        nonce: &TokenNonce,
        table_id: TableId,
        key_index: KeyIndex,
        plaintext: &FingerprintHash,
    ) -> (Ciphertext, AuthTag) {
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .expect("derived key is always 32 bytes");
        let aad = associated_data(table_id, key_index);

        let mut sealed = cipher
            .encrypt(
                Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &aad,
                },
            )
            .expect("encryption over a 32-byte message cannot fail");

        // The aead crate appends the tag to the ciphertext; split it off.
        let tag_bytes = sealed.split_off(sealed.len() - 16);
        let mut tag = [0u8; 16];
        tag.copy_from_slice(&tag_bytes);

        (Ciphertext(sealed), AuthTag(tag))
    }

    /// Decrypt and authenticate a token body.
    ///
    /// Fails with [`CoreError::AuthenticationFailure`] on any tag mismatch,
    /// with no indication of which input was wrong.
    pub fn decrypt(
        key: &DerivedKey,
        nonce: &TokenNonce,
        table_id: TableId,
        key_index: KeyIndex,
        ciphertext: &Ciphertext,
        tag: &AuthTag,
    ) -> Result<FingerprintHash, CoreError> {
        let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes())
            .expect("derived key is always 32 bytes");
        let aad = associated_data(table_id, key_index);

        let mut sealed = Vec::with_capacity(ciphertext.as_bytes().len() + 16);
        sealed.extend_from_slice(ciphertext.as_bytes());
        sealed.extend_from_slice(tag.as_bytes());

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: &sealed,
                    aad: &aad,
                },
            )
            .map_err(|_| CoreError::AuthenticationFailure)?;

        if plaintext.len() != 32 {
            return Err(CoreError::InvalidPlaintextLength(plaintext.len()));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&plaintext);
        Ok(FingerprintHash(out))
    }
}

fn associated_data(table_id: TableId, key_index: KeyIndex) -> [u8; 8] {
    let mut aad = [0u8; 8];
    aad[..4].copy_from_slice(&table_id.to_be_bytes());
    aad[4..].copy_from_slice(&key_index.to_be_bytes());
    aad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (DerivedKey, TokenNonce, FingerprintHash) {
        (
            DerivedKey::from_bytes([0x7E; 32]),
            TokenNonce::from_bytes([0x01; 12]),
            FingerprintHash::from_bytes([0xC4; 32]),
        )
    }

    #[test]
    fn test_roundtrip() {
        let (key, nonce, fp) = setup();
        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);
        let recovered =
            TokenCipher::decrypt(&key, &nonce, TableId(1), KeyIndex(2), &ct, &tag).unwrap();
        assert_eq!(recovered, fp);
    }

    #[test]
    fn test_ciphertext_is_plaintext_sized() {
        let (key, nonce, fp) = setup();
        let (ct, _) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);
        assert_eq!(ct.as_bytes().len(), 32);
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let (key, nonce, fp) = setup();
        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);

        // Flip each bit of the ciphertext in turn; every variant must fail.
        for byte in 0..ct.as_bytes().len() {
            for bit in 0..8 {
                let mut bytes = ct.as_bytes().to_vec();
                bytes[byte] ^= 1 << bit;
                let tampered = Ciphertext::from_bytes(bytes);
                let err =
                    TokenCipher::decrypt(&key, &nonce, TableId(1), KeyIndex(2), &tampered, &tag)
                        .unwrap_err();
                assert!(matches!(err, CoreError::AuthenticationFailure));
            }
        }
    }

    #[test]
    fn test_tampered_tag_fails() {
        let (key, nonce, fp) = setup();
        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);

        for byte in 0..16 {
            for bit in 0..8 {
                let mut tag_bytes = *tag.as_bytes();
                tag_bytes[byte] ^= 1 << bit;
                let tampered = AuthTag::from_bytes(tag_bytes);
                let err =
                    TokenCipher::decrypt(&key, &nonce, TableId(1), KeyIndex(2), &ct, &tampered)
                        .unwrap_err();
                assert!(matches!(err, CoreError::AuthenticationFailure));
            }
        }
    }

    #[test]
    fn test_wrong_coordinates_fail() {
        let (key, nonce, fp) = setup();
        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);

        assert!(TokenCipher::decrypt(&key, &nonce, TableId(9), KeyIndex(2), &ct, &tag).is_err());
        assert!(TokenCipher::decrypt(&key, &nonce, TableId(1), KeyIndex(9), &ct, &tag).is_err());
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let (key, nonce, fp) = setup();
        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);

        let mut bytes = *nonce.as_bytes();
        bytes[0] ^= 0x01;
        let wrong = TokenNonce::from_bytes(bytes);
        assert!(TokenCipher::decrypt(&key, &wrong, TableId(1), KeyIndex(2), &ct, &tag).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let (key, nonce, fp) = setup();
        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(1), KeyIndex(2), &fp);
        let other = DerivedKey::from_bytes([0x7F; 32]);
        assert!(TokenCipher::decrypt(&other, &nonce, TableId(1), KeyIndex(2), &ct, &tag).is_err());
    }

    // Known-answer vector for the full convention: key derived from the
    // all-zero master at index 0, counting nonce, table_id=7, key_index=0.
    #[test]
    fn test_known_answer_vector() {
        let key = DerivedKey::from_bytes(
            hex_array("65b3cf8e843808df0492fe0dc4f1e8b7764bcbab263d3c082a28effae8968ddb"),
        );
        let nonce = TokenNonce::from_bytes([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        let fp = FingerprintHash::from_bytes([0xAA; 32]);

        let (ct, tag) = TokenCipher::encrypt(&key, &nonce, TableId(7), KeyIndex(0), &fp);
        assert_eq!(
            hex::encode(ct.as_bytes()),
            "74d01dc7c04e7208b512e370c46715fabd20e996b41400ff5f2d88c68aa926d6"
        );
        assert_eq!(
            hex::encode(tag.as_bytes()),
            "736982cd675d83342e0e1661dac34c17"
        );
    }

    fn hex_array(s: &str) -> [u8; 32] {
        let bytes = hex::decode(s).unwrap();
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        arr
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn roundtrip_for_any_inputs(
                key in any::<[u8; 32]>(),
                nonce in any::<[u8; 12]>(),
                fp in any::<[u8; 32]>(),
                table in any::<u32>(),
                index in any::<u32>(),
            ) {
                let key = DerivedKey::from_bytes(key);
                let nonce = TokenNonce::from_bytes(nonce);
                let fp = FingerprintHash::from_bytes(fp);
                let (ct, tag) =
                    TokenCipher::encrypt(&key, &nonce, TableId(table), KeyIndex(index), &fp);
                let recovered =
                    TokenCipher::decrypt(&key, &nonce, TableId(table), KeyIndex(index), &ct, &tag)
                        .unwrap();
                prop_assert_eq!(recovered, fp);
            }
        }
    }
}
