//! # Aperture Core
//!
//! Pure primitives for the Aperture capture-attestation protocol: hashes,
//! key derivation, the AEAD token cipher, and the capture-side selector.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`ImageHash`] / [`FingerprintHash`] - 32-byte content and device hashes
//! - [`MasterKey`] - a provisioned 32-byte table master key
//! - [`CameraToken`] - the per-capture encrypted authentication token
//! - [`TokenSelector`] - uniform (table, key index) selection policy
//!
//! ## Wire Conventions
//!
//! Key derivation, the AEAD associated-data binding, and the combined sealed
//! token form are interoperability contracts. See [`keys`] and [`token`].

pub mod cipher;
pub mod credential;
pub mod error;
pub mod hash;
pub mod keys;
pub mod selector;
pub mod token;
pub mod types;

pub use cipher::{Ciphertext, TokenCipher};
pub use credential::SecureCredentialStore;
pub use error::CoreError;
pub use hash::{FingerprintHash, ImageHash};
pub use keys::{DerivedKey, MasterKey, DERIVATION_SALT};
pub use selector::{TableAssignment, TokenSelector};
pub use token::{AuthTag, CameraToken, TokenNonce};
pub use types::{BatchId, DeviceId, KeyIndex, TableId, TransactionId};
