//! 32-byte hash newtypes.
//!
//! [`ImageHash`] identifies captured content; [`FingerprintHash`] is the
//! per-device hardware secret that is only ever transmitted under AEAD.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A 32-byte hash of captured image content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageHash(pub [u8; 32]);

impl ImageHash {
    /// Compute the Blake3 hash of raw image bytes.
    pub fn hash(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string (the 64-hex API form).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from the 64-hex API form.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        parse_hash_hex(s).map(Self)
    }
}

impl fmt::Debug for ImageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageHash({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for ImageHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ImageHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// A 32-byte device fingerprint hash (NUC-derived hardware secret).
///
/// This value is the plaintext of every [`crate::CameraToken`] and must never
/// appear in logs or API payloads in the clear, which is why `Debug` redacts it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FingerprintHash(pub [u8; 32]);

impl FingerprintHash {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FingerprintHash(..)")
    }
}

impl AsRef<[u8]> for FingerprintHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for FingerprintHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

fn parse_hash_hex(s: &str) -> Result<[u8; 32], CoreError> {
    let bytes = hex::decode(s).map_err(|e| CoreError::InvalidHashEncoding(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(CoreError::InvalidHashEncoding(format!(
            "expected 32 bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_hash_deterministic() {
        let h1 = ImageHash::hash(b"raw sensor frame");
        let h2 = ImageHash::hash(b"raw sensor frame");
        assert_eq!(h1, h2);
        assert_ne!(h1, ImageHash::hash(b"different frame"));
    }

    #[test]
    fn test_image_hash_hex_roundtrip() {
        let h = ImageHash::hash(b"frame");
        let recovered = ImageHash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, recovered);
    }

    #[test]
    fn test_image_hash_rejects_bad_hex() {
        assert!(ImageHash::from_hex("deadbeef").is_err());
        assert!(ImageHash::from_hex("zz").is_err());
    }

    #[test]
    fn test_fingerprint_debug_redacted() {
        let fp = FingerprintHash::from_bytes([0x5A; 32]);
        let rendered = format!("{fp:?}");
        assert!(!rendered.contains("5a5a"));
    }
}
