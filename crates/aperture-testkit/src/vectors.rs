//! Golden test vectors for the derivation and token-cipher contracts.
//!
//! Expected values were computed with an independent HKDF-SHA256 and
//! ChaCha20-Poly1305 implementation; any drift here breaks interoperability
//! with already-provisioned devices.

use aperture_core::{
    FingerprintHash, KeyIndex, MasterKey, TableId, TokenCipher, TokenNonce,
};

/// One key-derivation vector.
#[derive(Debug, Clone)]
pub struct DerivationVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Master key bytes.
    pub master_key: [u8; 32],
    /// Key index to derive.
    pub key_index: u32,
    /// Index domain the derivation is checked against.
    pub keys_per_table: u32,
    /// Expected derived key (hex).
    pub expected_derived_key: &'static str,
}

/// All key-derivation vectors.
pub fn all_vectors() -> Vec<DerivationVector> {
    vec![
        DerivationVector {
            name: "zero master, index 0",
            master_key: [0x00; 32],
            key_index: 0,
            keys_per_table: 42,
            expected_derived_key:
                "65b3cf8e843808df0492fe0dc4f1e8b7764bcbab263d3c082a28effae8968ddb",
        },
        DerivationVector {
            name: "zero master, index 1",
            master_key: [0x00; 32],
            key_index: 1,
            keys_per_table: 42,
            expected_derived_key:
                "b5e4f79e8a525f6073a83d42c92af00da139325b4c56d6e9e710839dd95eeda0",
        },
        DerivationVector {
            name: "zero master, last index",
            master_key: [0x00; 32],
            key_index: 41,
            keys_per_table: 42,
            expected_derived_key:
                "4db2102455649c099c43c7e0de94fc046f4525653efa9c190baf4e78467f41bc",
        },
        DerivationVector {
            name: "all-ones master, index 0",
            master_key: [0xFF; 32],
            key_index: 0,
            keys_per_table: 42,
            expected_derived_key:
                "126dfc361d23423bc261c8015cd9f6f1e2d33fd4c7a2910445003e83195d3408",
        },
        DerivationVector {
            name: "all-ones master, index 1",
            master_key: [0xFF; 32],
            key_index: 1,
            keys_per_table: 42,
            expected_derived_key:
                "a202d467541441082af2b6eef90cc089260dd9d70b274073bb6f0210f1e7dc96",
        },
        DerivationVector {
            name: "all-ones master, last index",
            master_key: [0xFF; 32],
            key_index: 41,
            keys_per_table: 42,
            expected_derived_key:
                "94c866bff06df2a9ab43ac063ba912bb09a2df9706b275d62d476dec2d5f9670",
        },
    ]
}

/// Derive every vector and compare against its expected output.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let master = MasterKey::from_bytes(vector.master_key);
        let derived = master
            .derive(KeyIndex(vector.key_index), vector.keys_per_table)
            .map_err(|e| format!("{}: {e}", vector.name))?;
        let got = hex::encode(derived.as_bytes());
        if got != vector.expected_derived_key {
            return Err(format!(
                "{}: derived {got}, expected {}",
                vector.name, vector.expected_derived_key
            ));
        }
    }
    Ok(())
}

/// The token-cipher known answer: fixed key, nonce, and binding.
pub struct CipherVector {
    pub master_key: [u8; 32],
    pub key_index: u32,
    pub keys_per_table: u32,
    pub nonce: [u8; 12],
    pub table_id: u32,
    pub plaintext: [u8; 32],
    pub expected_ciphertext: &'static str,
    pub expected_tag: &'static str,
}

/// The single cipher known-answer vector.
pub fn cipher_vector() -> CipherVector {
    CipherVector {
        master_key: [0x00; 32],
        key_index: 0,
        keys_per_table: 42,
        nonce: [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b,
        ],
        table_id: 7,
        plaintext: [0xAA; 32],
        expected_ciphertext: "74d01dc7c04e7208b512e370c46715fabd20e996b41400ff5f2d88c68aa926d6",
        expected_tag: "736982cd675d83342e0e1661dac34c17",
    }
}

/// Encrypt the cipher vector and compare against its expected output.
pub fn verify_cipher_vector() -> Result<(), String> {
    let v = cipher_vector();
    let master = MasterKey::from_bytes(v.master_key);
    let derived = master
        .derive(KeyIndex(v.key_index), v.keys_per_table)
        .map_err(|e| e.to_string())?;
    let (ciphertext, tag) = TokenCipher::encrypt(
        &derived,
        &TokenNonce::from_bytes(v.nonce),
        TableId(v.table_id),
        KeyIndex(v.key_index),
        &FingerprintHash::from_bytes(v.plaintext),
    );
    if hex::encode(ciphertext.as_bytes()) != v.expected_ciphertext {
        return Err(format!(
            "ciphertext {}, expected {}",
            hex::encode(ciphertext.as_bytes()),
            v.expected_ciphertext
        ));
    }
    if hex::encode(tag.as_bytes()) != v.expected_tag {
        return Err(format!(
            "tag {}, expected {}",
            hex::encode(tag.as_bytes()),
            v.expected_tag
        ));
    }
    Ok(())
}
