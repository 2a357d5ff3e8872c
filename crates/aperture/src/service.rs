//! The unified Aperture service.
//!
//! Ties the validator, submission ledger, batcher, and publisher into the
//! submit/verify API. Validation never sees image hashes; verification never
//! blocks on an in-flight batch build - a hash is visible either as pending
//! or as part of a fully sealed batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use aperture_core::{BatchId, CameraToken, ImageHash, TransactionId};
use aperture_ledger::{
    now_millis, LedgerClient, LedgerConfig, MerkleBatcher, ModificationLevel, Publisher,
    Submission, SubmissionLedger, SubmissionStatus, TransactionOutcome,
};
use aperture_merkle::{verify_proof, MerkleProof, VerifyOutcome};
use aperture_store::{BatchState, BatchStore, DeviceRegistry, KeyTableStore, LedgerRef};

use crate::config::ApertureConfig;
use crate::error::{ApertureError, Result};
use crate::validator::AuthorityValidator;

/// One submitted hash of a capture event, as received at the API boundary.
///
/// The token authenticates the device; the image hash rides alongside and is
/// handed to the ledger only after the token passes, without ever entering
/// the validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionBundle {
    pub image_hash: ImageHash,
    pub modification_level: ModificationLevel,
    pub parent_image_hash: Option<ImageHash>,
    pub transaction_id: TransactionId,
    pub token: CameraToken,
}

/// Outcome of submitting one capture event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureReport {
    pub transaction_id: TransactionId,
    pub outcome: TransactionOutcome,
}

/// Trust tier of a verification result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationLevel {
    /// Proof verified against the root read back from the external ledger.
    Ledger,
    /// Known to the aggregator but not yet ledger-confirmed.
    Pending,
    /// Never submitted, or rejected.
    NotFound,
}

/// Verification response for one image hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub image_hash: ImageHash,
    /// True only for trustless, ledger-confirmed verification.
    pub verified: bool,
    pub level: VerificationLevel,
    pub batch_id: Option<BatchId>,
    pub merkle_proof: Option<MerkleProof>,
    pub ledger_ref: Option<LedgerRef>,
}

/// The main service struct.
pub struct Aperture {
    validator: AuthorityValidator,
    submissions: Arc<SubmissionLedger>,
    batcher: MerkleBatcher,
    publisher: Publisher,
    batch_store: Arc<dyn BatchStore>,
    client: Arc<dyn LedgerClient>,
}

impl Aperture {
    /// Assemble the service from its storage and ledger collaborators.
    pub fn new(
        tables: KeyTableStore,
        registry: Arc<dyn DeviceRegistry>,
        batch_store: Arc<dyn BatchStore>,
        client: Arc<dyn LedgerClient>,
        config: ApertureConfig,
    ) -> Self {
        let tables = Arc::new(tables);
        let submissions = Arc::new(SubmissionLedger::new(config.ledger.clone()));
        let validator = AuthorityValidator::new(
            tables,
            registry,
            config.keys_per_table,
            config.allow_retired_tables,
        );
        let batcher = MerkleBatcher::new(submissions.clone(), batch_store.clone());
        let publisher = Publisher::new(
            batch_store.clone(),
            client.clone(),
            submissions.clone(),
            config.backoff.clone(),
        );
        Self {
            validator,
            submissions,
            batcher,
            publisher,
            batch_store,
            client,
        }
    }

    /// The batch trigger configuration in effect.
    pub fn ledger_config(&self) -> &LedgerConfig {
        self.submissions.config()
    }

    /// Submit one capture event: every bundle of one transaction together.
    ///
    /// Each bundle's token is validated independently; the transaction then
    /// commits atomically - all hashes enter the pending pool, or all are
    /// rejected.
    pub async fn submit_capture(&self, bundles: Vec<SubmissionBundle>) -> Result<CaptureReport> {
        if bundles.is_empty() {
            return Err(ApertureError::EmptyCapture);
        }
        let transaction_id = bundles[0].transaction_id.clone();

        let mut members = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let verdict = self.validator.validate(&bundle.token).await?;
            members.push((
                Submission::new(
                    bundle.image_hash,
                    bundle.modification_level,
                    bundle.parent_image_hash,
                    bundle.transaction_id,
                ),
                verdict.passed(),
            ));
        }

        let outcome = self
            .submissions
            .commit_transaction(members, now_millis())?;
        Ok(CaptureReport {
            transaction_id,
            outcome,
        })
    }

    /// Seal a batch if a trigger has fired, then push any sealed-unpublished
    /// roots to the external ledger. Intended to run on a timer.
    pub async fn tick(&self, now: i64) -> Result<()> {
        self.batcher.seal_if_due(now).await?;
        self.publisher.publish_all().await?;
        Ok(())
    }

    /// Force-seal whatever is pending (administrative / shutdown path).
    pub async fn seal_now(&self, now: i64) -> Result<Option<BatchId>> {
        Ok(self.batcher.seal_now(now).await?)
    }

    /// Publish all sealed-unpublished batches.
    ///
    /// Returns the references accepted this sweep. A batch the ledger could
    /// not take stays sealed and is attempted again on the next sweep; it
    /// never blocks the batches behind it.
    pub async fn publish_sealed(&self) -> Result<Vec<LedgerRef>> {
        Ok(self.publisher.publish_all().await?.published)
    }

    /// Verify a hash's inclusion.
    ///
    /// - `ledger`: a proof exists and reconstructs the root independently
    ///   read back from the external ledger.
    /// - `pending`: the hash is known (awaiting batching, or sealed but not
    ///   yet ledger-confirmed); any available proof is checked against the
    ///   aggregator's own sealed root.
    /// - `not_found`: no proof and no pending submission.
    ///
    /// A proof that fails to reconstruct its root is a
    /// [`ApertureError::ProofMismatch`], not a miss.
    pub async fn verify(&self, image_hash: &ImageHash) -> Result<VerificationReport> {
        let Some(proof) = self.batch_store.proof_for_leaf(image_hash).await? else {
            return Ok(self.report_unbatched(image_hash));
        };

        let batch = self
            .batch_store
            .get_batch(proof.batch_id)
            .await?
            .ok_or(aperture_store::StoreError::UnknownBatch(proof.batch_id))?;

        // Published batch: trustless path against the external ledger's root.
        if batch.state == BatchState::Published {
            if let Some(ledger_ref) = &batch.ledger_ref {
                let trusted_root = self
                    .client
                    .fetch_root(ledger_ref)
                    .await?
                    .ok_or_else(|| {
                        ApertureError::LedgerUnavailable(format!(
                            "no root at {}",
                            ledger_ref.as_str()
                        ))
                    })?;

                return match verify_proof(image_hash, &proof, &trusted_root) {
                    VerifyOutcome::Verified => Ok(VerificationReport {
                        image_hash: *image_hash,
                        verified: true,
                        level: VerificationLevel::Ledger,
                        batch_id: Some(batch.batch_id),
                        merkle_proof: Some(proof),
                        ledger_ref: Some(ledger_ref.clone()),
                    }),
                    VerifyOutcome::Mismatch => {
                        tracing::error!(
                            image_hash = %image_hash.to_hex(),
                            batch = %batch.batch_id,
                            "proof does not reconstruct the published root"
                        );
                        Err(ApertureError::ProofMismatch {
                            image_hash: image_hash.to_hex(),
                            batch_id: batch.batch_id,
                        })
                    }
                };
            }
        }

        // Sealed but unpublished: aggregator-trust only.
        match verify_proof(image_hash, &proof, &batch.merkle_root) {
            VerifyOutcome::Verified => Ok(VerificationReport {
                image_hash: *image_hash,
                verified: false,
                level: VerificationLevel::Pending,
                batch_id: Some(batch.batch_id),
                merkle_proof: Some(proof),
                ledger_ref: None,
            }),
            VerifyOutcome::Mismatch => Err(ApertureError::ProofMismatch {
                image_hash: image_hash.to_hex(),
                batch_id: batch.batch_id,
            }),
        }
    }

    fn report_unbatched(&self, image_hash: &ImageHash) -> VerificationReport {
        let level = match self.submissions.status_of(image_hash) {
            Some(
                SubmissionStatus::Received
                | SubmissionStatus::Validating
                | SubmissionStatus::Validated
                | SubmissionStatus::Batched
                | SubmissionStatus::Published,
            ) => VerificationLevel::Pending,
            Some(SubmissionStatus::Rejected) | None => VerificationLevel::NotFound,
        };
        VerificationReport {
            image_hash: *image_hash,
            verified: false,
            level,
            batch_id: None,
            merkle_proof: None,
            ledger_ref: None,
        }
    }
}
