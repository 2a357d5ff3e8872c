//! # Aperture
//!
//! The unified API for the Aperture capture-attestation system: rotating
//! encrypted-token device authentication and trustless Merkle inclusion
//! proofs for captured image hashes.
//!
//! ## Overview
//!
//! A registered camera proves each capture came from real hardware without
//! ever revealing its identity or its images to the validating authority:
//!
//! - **Token**: per capture, the device picks one of its 3 assigned key
//!   tables and a random key index, derives a key, and encrypts its
//!   fingerprint hash under it. Selections are independent across captures,
//!   so tokens are unlinkable.
//! - **Validation**: the authority derives the same key, decrypts, and
//!   matches the fingerprint against the device registry. It is never given
//!   the image hash - by construction, not by policy.
//! - **Batching**: validated image hashes are grouped by capture transaction
//!   and drained into sealed Merkle batches; each leaf gets an inclusion
//!   proof.
//! - **Verification**: anyone can recompute a leaf's path to the root and
//!   compare against the root published on the external ledger, with no
//!   trust in the aggregator.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aperture::{Aperture, ApertureConfig};
//! use aperture_store::{KeyTableStore, MemoryBatchStore, MemoryDeviceRegistry};
//!
//! # fn make_client() -> Arc<dyn aperture_ledger::LedgerClient> { unimplemented!() }
//! async fn example() {
//!     let tables = KeyTableStore::load(vec![/* provisioned tables */]).unwrap();
//!     let registry = Arc::new(MemoryDeviceRegistry::new());
//!     let batch_store = Arc::new(MemoryBatchStore::new());
//!     let client = make_client();
//!
//!     let aperture = Aperture::new(
//!         tables,
//!         registry,
//!         batch_store,
//!         client,
//!         ApertureConfig::default(),
//!     );
//!
//!     // let report = aperture.submit_capture(bundles).await.unwrap();
//!     // aperture.tick(aperture_ledger::now_millis()).await.unwrap();
//!     // let verification = aperture.verify(&image_hash).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! The component crates are re-exported for convenience:
//!
//! - [`core`] - hashes, keys, tokens, selector
//! - [`merkle`] - trees, proofs, verification
//! - [`store`] - key tables, device registry, batch store
//! - [`ledger`] - submissions, batcher, publisher

pub use aperture_core as core;
pub use aperture_ledger as ledger;
pub use aperture_merkle as merkle;
pub use aperture_store as store;

pub mod config;
pub mod error;
pub mod service;
pub mod validator;

pub use config::ApertureConfig;
pub use error::{ApertureError, Result};
pub use service::{
    Aperture, CaptureReport, SubmissionBundle, VerificationLevel, VerificationReport,
};
pub use validator::{AuthorityValidator, FailReason, ValidationOutcome};
