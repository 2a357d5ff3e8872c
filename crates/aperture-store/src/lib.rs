//! # Aperture Store
//!
//! Storage abstractions for the Aperture validator and batcher.
//!
//! ## Overview
//!
//! Three storage surfaces live here:
//!
//! - [`KeyTableStore`] - the immutable-after-load mapping of table id to
//!   master key, checksum-verified before serving any validation traffic
//! - [`DeviceRegistry`] - async lookup of provisioned devices by fingerprint
//!   hash, with an in-memory implementation for tests
//! - [`BatchStore`] - async persistence of sealed batches plus their full
//!   proof arrays, keyed by batch id and indexed by leaf hash for O(1) proof
//!   lookup
//!
//! Persistence proper (a database backend) is an external collaborator; the
//! traits here are the interface it must implement. The in-memory
//! implementations have the same semantics and serve tests and
//! single-process deployments.
//!
//! ## Design Notes
//!
//! - **Verify-gated load**: [`KeyTableStore::load`] rejects tampered or
//!   truncated key material before the store can answer a single lookup.
//! - **Sealed means immutable**: a stored [`Batch`] only ever changes by
//!   acquiring a ledger reference when published.
//! - **Canonical records**: the batch store caches a canonical CBOR encoding
//!   of each sealed batch, so independent stores can compare records
//!   byte-for-byte.

pub mod batches;
pub mod error;
pub mod keytable;
pub mod registry;

pub use batches::{Batch, BatchState, BatchStore, LedgerRef, MemoryBatchStore};
pub use error::{Result, StoreError};
pub use keytable::{KeyTableStore, MasterKeyTable, ProvisionedTable, TableStatus};
pub use registry::{DeviceRecord, DeviceRegistry, MemoryDeviceRegistry};
