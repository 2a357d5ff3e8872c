//! The submission ledger: transaction grouping and the pending pool.
//!
//! All state mutations happen under one internal lock, which gives every
//! transaction commit its critical section: the batcher can never observe a
//! partially-validated transaction, and concurrent sibling arrivals cannot
//! interleave with a commit.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use aperture_core::{ImageHash, TransactionId};

use crate::error::{LedgerError, Result};
use crate::submission::{Submission, SubmissionStatus};

/// Batch trigger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Size trigger: seal once this many validated hashes are pending.
    pub batch_max_leaves: usize,
    /// Time trigger: seal once the oldest pending entry is this old (ms).
    pub batch_max_age_ms: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            batch_max_leaves: 1000,
            // 6 hours: bounds publication latency for quiet periods.
            batch_max_age_ms: 6 * 60 * 60 * 1000,
        }
    }
}

/// Atomic outcome of one capture transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Every member validated; all enqueued for batching.
    Validated,
    /// At least one member failed; every member rejected, none batched.
    Rejected,
}

struct PendingEntry {
    image_hash: ImageHash,
    enqueued_at: i64,
}

struct LedgerInner {
    submissions: HashMap<ImageHash, Submission>,
    pending: VecDeque<PendingEntry>,
}

/// Groups incoming validated hashes by transaction and feeds the batcher.
pub struct SubmissionLedger {
    config: LedgerConfig,
    inner: Mutex<LedgerInner>,
}

impl SubmissionLedger {
    /// Create an empty ledger.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(LedgerInner {
                submissions: HashMap::new(),
                pending: VecDeque::new(),
            }),
        }
    }

    /// Commit one capture transaction atomically.
    ///
    /// `members` pairs each submission with its token-validation verdict. If
    /// every verdict passed, all members become `Validated` and enter the
    /// pending pool; if any failed, all members become `Rejected` and none
    /// do. No transaction is ever split across outcomes or batches.
    pub fn commit_transaction(
        &self,
        members: Vec<(Submission, bool)>,
        now: i64,
    ) -> Result<TransactionOutcome> {
        if members.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        }
        let transaction_id: TransactionId = members[0].0.transaction_id.clone();
        if members
            .iter()
            .any(|(s, _)| s.transaction_id != transaction_id)
        {
            return Err(LedgerError::MixedTransaction);
        }

        let all_passed = members.iter().all(|(_, passed)| *passed);

        let mut inner = self.inner.lock().unwrap();

        // Reject duplicates before mutating anything.
        for (submission, _) in &members {
            if inner.submissions.contains_key(&submission.image_hash) {
                return Err(LedgerError::DuplicateSubmission(
                    submission.image_hash.to_hex(),
                ));
            }
        }

        for (mut submission, _) in members {
            submission.advance(SubmissionStatus::Validating)?;
            if all_passed {
                submission.advance(SubmissionStatus::Validated)?;
                inner.pending.push_back(PendingEntry {
                    image_hash: submission.image_hash,
                    enqueued_at: now,
                });
            } else {
                submission.advance(SubmissionStatus::Rejected)?;
            }
            inner
                .submissions
                .insert(submission.image_hash, submission);
        }

        if all_passed {
            Ok(TransactionOutcome::Validated)
        } else {
            // Recorded once per transaction, not once per member.
            tracing::warn!(transaction = %transaction_id, "transaction rejected; no member batched");
            Ok(TransactionOutcome::Rejected)
        }
    }

    /// The batch trigger configuration in effect.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Current status of a submitted hash, if known.
    pub fn status_of(&self, image_hash: &ImageHash) -> Option<SubmissionStatus> {
        let inner = self.inner.lock().unwrap();
        inner.submissions.get(image_hash).map(|s| s.status)
    }

    /// Number of validated hashes awaiting batching.
    pub fn pending_len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.pending.len()
    }

    /// Whether either batch trigger has fired.
    pub fn batch_due(&self, now: i64) -> bool {
        let inner = self.inner.lock().unwrap();
        if inner.pending.len() >= self.config.batch_max_leaves {
            return true;
        }
        match inner.pending.front() {
            Some(oldest) => now - oldest.enqueued_at >= self.config.batch_max_age_ms,
            None => false,
        }
    }

    /// Drain the entire pending pool in insertion order, each entry paired
    /// with its original enqueue time.
    ///
    /// Intended for the single batch writer; entries leave the pool here and
    /// either come back via [`restore_pending`](Self::restore_pending) on a
    /// persist failure or advance to `Batched`.
    pub fn take_batch_snapshot(&self) -> Vec<(ImageHash, i64)> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .pending
            .drain(..)
            .map(|e| (e.image_hash, e.enqueued_at))
            .collect()
    }

    /// Put a failed snapshot back at the front of the pool.
    ///
    /// Order and enqueue times survive the round-trip, so the age trigger
    /// keeps measuring from the oldest entry's original arrival.
    pub fn restore_pending(&self, entries: &[(ImageHash, i64)]) {
        let mut inner = self.inner.lock().unwrap();
        for (image_hash, enqueued_at) in entries.iter().rev() {
            inner.pending.push_front(PendingEntry {
                image_hash: *image_hash,
                enqueued_at: *enqueued_at,
            });
        }
    }

    /// Advance drained submissions to `Batched`.
    pub fn mark_batched(&self, hashes: &[ImageHash]) -> Result<()> {
        self.advance_all(hashes, SubmissionStatus::Batched)
    }

    /// Advance batched submissions to `Published`.
    pub fn mark_published(&self, hashes: &[ImageHash]) -> Result<()> {
        self.advance_all(hashes, SubmissionStatus::Published)
    }

    fn advance_all(&self, hashes: &[ImageHash], next: SubmissionStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        for hash in hashes {
            let submission = inner
                .submissions
                .get_mut(hash)
                .ok_or_else(|| LedgerError::UnknownSubmission(hash.to_hex()))?;
            submission.advance(next)?;
        }
        Ok(())
    }
}
