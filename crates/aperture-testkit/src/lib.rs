//! # Aperture Testkit
//!
//! Testing utilities for Aperture.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: key-derivation and token-cipher test cases with
//!   expected outputs for cross-implementation verification
//! - **Generators**: proptest strategies for property-based testing
//! - **Fixtures**: a provisioned deployment (key tables, device registry,
//!   software camera, in-memory ledger) for integration tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use aperture_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().expect("derivation contract broken");
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use aperture_testkit::fixtures::DeploymentFixture;
//!
//! let fixture = DeploymentFixture::with_seed([7; 32]);
//! let camera = fixture.camera();
//! let (hash, token) = camera.capture(b"raw sensor frame");
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{CameraDevice, DeploymentFixture, InMemoryLedger, MemoryCredentialStore};
pub use vectors::{all_vectors, verify_all_vectors, DerivationVector};
