//! Submissions and their validation state machine.
//!
//! `Received → Validating → {Validated, Rejected}`;
//! `Validated → Batched → Published`. Terminal states are `Rejected` and
//! `Published`; no transition moves backward.

use serde::{Deserialize, Serialize};

use aperture_core::{ImageHash, TransactionId};

use crate::error::LedgerError;

/// How far the submitted hash is from the original capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModificationLevel {
    /// The unmodified capture.
    Original,
    /// An in-camera adjustment of the original (crop, tone).
    Adjusted,
    /// A composite derived from one or more captures.
    Composite,
}

impl ModificationLevel {
    /// The wire encoding (`0|1|2`).
    pub const fn as_u8(self) -> u8 {
        match self {
            ModificationLevel::Original => 0,
            ModificationLevel::Adjusted => 1,
            ModificationLevel::Composite => 2,
        }
    }

    /// Parse the wire encoding.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ModificationLevel::Original),
            1 => Some(ModificationLevel::Adjusted),
            2 => Some(ModificationLevel::Composite),
            _ => None,
        }
    }
}

/// Validation/batching state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    Received,
    Validating,
    Validated,
    Rejected,
    Batched,
    Published,
}

impl SubmissionStatus {
    /// Whether this state admits no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, SubmissionStatus::Rejected | SubmissionStatus::Published)
    }

    /// Whether the state machine permits `self -> next`.
    pub const fn can_advance_to(self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (SubmissionStatus::Received, SubmissionStatus::Validating)
                | (SubmissionStatus::Validating, SubmissionStatus::Validated)
                | (SubmissionStatus::Validating, SubmissionStatus::Rejected)
                | (SubmissionStatus::Validated, SubmissionStatus::Batched)
                | (SubmissionStatus::Batched, SubmissionStatus::Published)
        )
    }
}

/// One submitted hash within a capture transaction.
///
/// Mutated only by the validator (status) and the batcher (batch
/// assignment); never mutated after reaching a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub image_hash: ImageHash,
    pub modification_level: ModificationLevel,
    /// For derived hashes, the hash they were derived from.
    pub parent_image_hash: Option<ImageHash>,
    pub transaction_id: TransactionId,
    pub status: SubmissionStatus,
}

impl Submission {
    /// Create a freshly received submission.
    pub fn new(
        image_hash: ImageHash,
        modification_level: ModificationLevel,
        parent_image_hash: Option<ImageHash>,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            image_hash,
            modification_level,
            parent_image_hash,
            transaction_id,
            status: SubmissionStatus::Received,
        }
    }

    /// Advance the state machine, rejecting illegal transitions.
    pub fn advance(&mut self, next: SubmissionStatus) -> Result<(), LedgerError> {
        if !self.status.can_advance_to(next) {
            return Err(LedgerError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
