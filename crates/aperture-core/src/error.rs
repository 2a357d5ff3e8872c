//! Error types for Aperture core primitives.

use thiserror::Error;

/// Core errors that can occur during key derivation and token operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Key index outside the configured `[0, keys_per_table)` domain.
    #[error("key index {index} out of range (keys per table: {limit})")]
    InvalidIndex { index: u32, limit: u32 },

    /// AEAD tag verification failed. Deliberately carries no detail about
    /// which step of decryption failed.
    #[error("token authentication failed")]
    AuthenticationFailure,

    /// Decrypted plaintext was not a 32-byte fingerprint hash.
    #[error("token plaintext has invalid length {0}")]
    InvalidPlaintextLength(usize),

    /// A sealed token blob was too short or otherwise malformed.
    #[error("malformed sealed token: {0}")]
    MalformedToken(String),

    /// Invalid hex when parsing a hash.
    #[error("invalid hash encoding: {0}")]
    InvalidHashEncoding(String),

    /// A device must be assigned exactly three distinct tables.
    #[error("invalid table assignment: {0}")]
    InvalidAssignment(String),

    /// Credential store failure (platform-specific backend).
    #[error("credential store error: {0}")]
    CredentialStore(String),
}
