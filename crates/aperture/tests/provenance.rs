//! End-to-end provenance flow: capture, submit, batch, publish, verify.
//!
//! Exercises the full pipeline through the public API only, with the
//! testkit's software camera and in-memory ledger standing in for hardware
//! and the external chain.

use std::sync::Arc;
use std::time::Duration;

use aperture::ledger::{
    now_millis, BackoffConfig, LedgerClient, LedgerConfig, ModificationLevel, TransactionOutcome,
};
use aperture::{Aperture, ApertureConfig, ApertureError, SubmissionBundle, VerificationLevel};
use aperture_core::{ImageHash, TransactionId};
use aperture_testkit::fixtures::{DeploymentFixture, InMemoryLedger};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn build_aperture(
    fixture: &DeploymentFixture,
    ledger: Arc<InMemoryLedger>,
) -> Aperture {
    init_tracing();
    let config = ApertureConfig {
        keys_per_table: fixture.keys_per_table,
        allow_retired_tables: true,
        ledger: LedgerConfig {
            batch_max_leaves: 100,
            batch_max_age_ms: 60_000,
        },
        backoff: BackoffConfig {
            initial: Duration::from_millis(5),
            max: Duration::from_millis(40),
        },
    };
    Aperture::new(
        fixture.key_table_store(),
        fixture.registry().await,
        fixture.batch_store(),
        ledger,
        config,
    )
}

fn bundle(
    camera: &aperture_testkit::fixtures::CameraDevice,
    image: &[u8],
    level: ModificationLevel,
    parent: Option<ImageHash>,
    txn: &TransactionId,
) -> SubmissionBundle {
    let (image_hash, token) = camera.capture(image);
    SubmissionBundle {
        image_hash,
        modification_level: level,
        parent_image_hash: parent,
        transaction_id: txn.clone(),
        token,
    }
}

#[tokio::test]
async fn capture_to_ledger_verification() {
    let fixture = DeploymentFixture::with_seed([1; 32]);
    let ledger = fixture.ledger();
    let aperture = build_aperture(&fixture, ledger.clone()).await;
    let camera = fixture.camera();

    let txn = TransactionId("txn-0001".to_string());
    let original = bundle(&camera, b"raw frame", ModificationLevel::Original, None, &txn);
    let original_hash = original.image_hash;
    let adjusted = bundle(
        &camera,
        b"adjusted frame",
        ModificationLevel::Adjusted,
        Some(original_hash),
        &txn,
    );
    let adjusted_hash = adjusted.image_hash;

    let report = aperture
        .submit_capture(vec![original, adjusted])
        .await
        .unwrap();
    assert_eq!(report.outcome, TransactionOutcome::Validated);

    let batch_id = aperture.seal_now(now_millis()).await.unwrap().unwrap();
    let refs = aperture.publish_sealed().await.unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(ledger.root_count(), 1);

    for hash in [original_hash, adjusted_hash] {
        let verification = aperture.verify(&hash).await.unwrap();
        assert!(verification.verified);
        assert_eq!(verification.level, VerificationLevel::Ledger);
        assert_eq!(verification.batch_id, Some(batch_id));
        assert!(verification.merkle_proof.is_some());
        assert!(verification.ledger_ref.is_some());
    }

    // A tampered proof must read as fraud, not as a miss.
    let verification = aperture.verify(&original_hash).await.unwrap();
    let mut proof = verification.merkle_proof.unwrap();
    if let Some(step) = proof.siblings.first_mut() {
        step.hash[0] ^= 0x01;
    }
    let trusted = ledger
        .fetch_root(&verification.ledger_ref.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        aperture::merkle::verify_proof(&original_hash, &proof, &trusted),
        aperture::merkle::VerifyOutcome::Mismatch
    );
}

#[tokio::test]
async fn rejected_transaction_poisons_every_member() {
    let fixture = DeploymentFixture::with_seed([2; 32]);
    let aperture = build_aperture(&fixture, fixture.ledger()).await;
    let camera = fixture.camera();
    let rogue = fixture.rogue_camera();

    let txn = TransactionId("txn-0002".to_string());
    let good = bundle(&camera, b"honest frame", ModificationLevel::Original, None, &txn);
    let good_hash = good.image_hash;
    let bad = bundle(&rogue, b"forged frame", ModificationLevel::Original, None, &txn);
    let bad_hash = bad.image_hash;

    let report = aperture.submit_capture(vec![good, bad]).await.unwrap();
    assert_eq!(report.outcome, TransactionOutcome::Rejected);

    // Nothing to seal; the whole transaction was refused.
    assert!(aperture.seal_now(now_millis()).await.unwrap().is_none());

    for hash in [good_hash, bad_hash] {
        let verification = aperture.verify(&hash).await.unwrap();
        assert!(!verification.verified);
        assert_eq!(verification.level, VerificationLevel::NotFound);
    }
}

#[tokio::test]
async fn pending_before_seal_and_before_publish() {
    let fixture = DeploymentFixture::with_seed([3; 32]);
    let aperture = build_aperture(&fixture, fixture.ledger()).await;
    let camera = fixture.camera();

    let txn = TransactionId("txn-0003".to_string());
    let submitted = bundle(&camera, b"frame", ModificationLevel::Original, None, &txn);
    let hash = submitted.image_hash;
    aperture.submit_capture(vec![submitted]).await.unwrap();

    // Validated but unbatched.
    let verification = aperture.verify(&hash).await.unwrap();
    assert!(!verification.verified);
    assert_eq!(verification.level, VerificationLevel::Pending);
    assert!(verification.merkle_proof.is_none());

    // Sealed but unpublished: a proof exists against the aggregator's root.
    let batch_id = aperture.seal_now(now_millis()).await.unwrap().unwrap();
    let verification = aperture.verify(&hash).await.unwrap();
    assert!(!verification.verified);
    assert_eq!(verification.level, VerificationLevel::Pending);
    assert_eq!(verification.batch_id, Some(batch_id));
    assert!(verification.merkle_proof.is_some());
    assert!(verification.ledger_ref.is_none());
}

#[tokio::test]
async fn unknown_hash_is_not_found() {
    let fixture = DeploymentFixture::with_seed([4; 32]);
    let aperture = build_aperture(&fixture, fixture.ledger()).await;

    let verification = aperture
        .verify(&ImageHash::hash(b"never submitted"))
        .await
        .unwrap();
    assert!(!verification.verified);
    assert_eq!(verification.level, VerificationLevel::NotFound);
    assert!(verification.batch_id.is_none());
}

#[tokio::test]
async fn publication_retries_through_ledger_outage() {
    let fixture = DeploymentFixture::with_seed([5; 32]);
    let ledger = fixture.ledger();
    let aperture = build_aperture(&fixture, ledger.clone()).await;
    let camera = fixture.camera();

    let txn = TransactionId("txn-0005".to_string());
    let submitted = bundle(&camera, b"frame", ModificationLevel::Original, None, &txn);
    let hash = submitted.image_hash;
    aperture.submit_capture(vec![submitted]).await.unwrap();
    aperture.seal_now(now_millis()).await.unwrap().unwrap();

    ledger.fail_next(3);
    let refs = aperture.publish_sealed().await.unwrap();
    assert_eq!(refs.len(), 1);

    let verification = aperture.verify(&hash).await.unwrap();
    assert!(verification.verified);
    assert_eq!(verification.level, VerificationLevel::Ledger);
}

#[tokio::test]
async fn resubmitting_a_hash_is_refused() {
    let fixture = DeploymentFixture::with_seed([6; 32]);
    let aperture = build_aperture(&fixture, fixture.ledger()).await;
    let camera = fixture.camera();

    let txn = TransactionId("txn-0006".to_string());
    let first = bundle(&camera, b"frame", ModificationLevel::Original, None, &txn);
    let hash = first.image_hash;
    aperture.submit_capture(vec![first]).await.unwrap();

    let txn2 = TransactionId("txn-0007".to_string());
    let mut replay = bundle(&camera, b"other frame", ModificationLevel::Original, None, &txn2);
    replay.image_hash = hash;
    let err = aperture.submit_capture(vec![replay]).await.unwrap_err();
    assert!(matches!(err, ApertureError::Ledger(_)));
}

#[tokio::test]
async fn empty_capture_is_refused() {
    let fixture = DeploymentFixture::with_seed([7; 32]);
    let aperture = build_aperture(&fixture, fixture.ledger()).await;

    let err = aperture.submit_capture(vec![]).await.unwrap_err();
    assert!(matches!(err, ApertureError::EmptyCapture));
}

#[tokio::test]
async fn tick_seals_and_publishes_when_pool_fills() {
    let fixture = DeploymentFixture::with_seed([8; 32]);
    let ledger = fixture.ledger();
    let config = ApertureConfig {
        keys_per_table: fixture.keys_per_table,
        allow_retired_tables: true,
        ledger: LedgerConfig {
            batch_max_leaves: 2,
            batch_max_age_ms: 3_600_000,
        },
        backoff: BackoffConfig {
            initial: Duration::from_millis(5),
            max: Duration::from_millis(40),
        },
    };
    let aperture = Aperture::new(
        fixture.key_table_store(),
        fixture.registry().await,
        fixture.batch_store(),
        ledger.clone(),
        config,
    );
    let camera = fixture.camera();

    for i in 0..2u8 {
        let txn = TransactionId(format!("txn-10{i}"));
        let submitted = bundle(&camera, &[i, 0x5A], ModificationLevel::Original, None, &txn);
        aperture.submit_capture(vec![submitted]).await.unwrap();
    }

    aperture.tick(now_millis()).await.unwrap();
    assert_eq!(ledger.root_count(), 1);
}
