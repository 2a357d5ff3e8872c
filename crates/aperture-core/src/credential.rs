//! Secure credential storage capability.
//!
//! Devices hold their fingerprint hash and assigned master keys in whatever
//! secure element the platform offers. The protocol only depends on this
//! capability surface; each platform supplies its own implementation.

use crate::error::CoreError;

/// Platform-neutral secure storage for device secrets.
///
/// Implementations are expected to be backed by hardware keystores where
/// available (secure enclave, StrongBox, TPM). `tamper_evident` reports
/// whether the backend can detect extraction attempts; callers may refuse to
/// provision onto stores that cannot.
pub trait SecureCredentialStore: Send + Sync {
    /// Persist a secret under an opaque identifier, replacing any previous
    /// value.
    fn store(&self, key_id: &str, secret: &[u8]) -> Result<(), CoreError>;

    /// Retrieve a previously stored secret, or `None` if absent.
    fn retrieve(&self, key_id: &str) -> Result<Option<Vec<u8>>, CoreError>;

    /// Destroy a secret. Erasing an absent key is not an error.
    fn erase(&self, key_id: &str) -> Result<(), CoreError>;

    /// Whether the backing store provides tamper evidence.
    fn tamper_evident(&self) -> bool;
}
