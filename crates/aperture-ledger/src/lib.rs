//! # Aperture Ledger
//!
//! The aggregation pipeline between validation and the external ledger:
//! transaction-atomic submission grouping, the pending pool with its dual
//! batch trigger, Merkle batch sealing, and root publication with unbounded
//! backoff retry.
//!
//! ## Flow
//!
//! Validated submissions enter the [`SubmissionLedger`] grouped by capture
//! transaction; a transaction commits atomically (all `Validated` or all
//! `Rejected`). The [`MerkleBatcher`] drains the pending pool when either
//! trigger fires (pool size or age of the oldest entry), seals an immutable
//! batch with a proof per leaf, and the [`Publisher`] hands the root to the
//! external [`LedgerClient`], retrying transient failures forever with
//! exponential backoff. A sealed batch is never re-batched and never
//! silently dropped.

pub mod batcher;
pub mod client;
pub mod error;
pub mod ledger;
pub mod publisher;
pub mod submission;

pub use batcher::MerkleBatcher;
pub use client::{LedgerClient, PublishError};
pub use error::{LedgerError, Result};
pub use ledger::{LedgerConfig, SubmissionLedger, TransactionOutcome};
pub use publisher::{BackoffConfig, Publisher, PublishSweep};
pub use submission::{ModificationLevel, Submission, SubmissionStatus};

/// Current time in Unix milliseconds. A pre-epoch system clock reads as 0
/// rather than panicking.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::now_millis;

    #[test]
    fn test_now_millis_never_negative() {
        let first = now_millis();
        let second = now_millis();
        assert!(first > 0);
        assert!(second >= first);
    }
}
