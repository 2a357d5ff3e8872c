//! Test fixtures and helpers.
//!
//! A [`DeploymentFixture`] stands in for a provisioning ceremony: it mints
//! the master key tables, registers one camera, and hands out the storage
//! and ledger collaborators an integration test needs. [`CameraDevice`] is a
//! software camera that seals tokens the way firmware would, holding its
//! keys in a [`MemoryCredentialStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use aperture_core::{
    BatchId, CameraToken, CoreError, DeviceId, FingerprintHash, ImageHash, MasterKey,
    SecureCredentialStore, TableAssignment, TableId, TokenNonce, TokenSelector,
};
use aperture_ledger::{LedgerClient, PublishError};
use aperture_merkle::MerkleRoot;
use aperture_store::{
    DeviceRecord, DeviceRegistry, KeyTableStore, LedgerRef, MasterKeyTable, MemoryBatchStore,
    MemoryDeviceRegistry, TableStatus,
};

/// Default key-index domain for fixtures. Small enough that index collisions
/// occur within a test run.
pub const FIXTURE_KEYS_PER_TABLE: u32 = 64;

/// In-memory [`SecureCredentialStore`], as a secure element stand-in.
#[derive(Default)]
pub struct MemoryCredentialStore {
    secrets: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureCredentialStore for MemoryCredentialStore {
    fn store(&self, key_id: &str, secret: &[u8]) -> Result<(), CoreError> {
        let mut secrets = self.secrets.write().unwrap();
        secrets.insert(key_id.to_string(), secret.to_vec());
        Ok(())
    }

    fn retrieve(&self, key_id: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let secrets = self.secrets.read().unwrap();
        Ok(secrets.get(key_id).cloned())
    }

    fn erase(&self, key_id: &str) -> Result<(), CoreError> {
        let mut secrets = self.secrets.write().unwrap();
        secrets.remove(key_id);
        Ok(())
    }

    fn tamper_evident(&self) -> bool {
        false
    }
}

/// A software camera holding a fingerprint, a table assignment, and the
/// three assigned master keys in its credential store.
pub struct CameraDevice {
    pub device_id: DeviceId,
    fingerprint: FingerprintHash,
    assignment: TableAssignment,
    credentials: MemoryCredentialStore,
    selector: TokenSelector,
    keys_per_table: u32,
    rng: Mutex<StdRng>,
}

impl CameraDevice {
    fn credential_id(table_id: TableId) -> String {
        format!("master-key-{}", table_id.0)
    }

    /// The fingerprint hash this device was provisioned with.
    pub fn fingerprint(&self) -> FingerprintHash {
        self.fingerprint
    }

    /// The device's table assignment.
    pub fn assignment(&self) -> &TableAssignment {
        &self.assignment
    }

    /// Capture an image: hash the bytes and seal a fresh token under a
    /// uniformly drawn (table, key index) pair.
    pub fn capture(&self, image: &[u8]) -> (ImageHash, CameraToken) {
        let image_hash = ImageHash::hash(image);
        let token = self.seal_token();
        (image_hash, token)
    }

    /// Seal a token without an image (token-only tests).
    pub fn seal_token(&self) -> CameraToken {
        let (table_id, key_index) = {
            let mut rng = self.rng.lock().unwrap();
            self.selector.select_with_rng(&self.assignment, &mut *rng)
        };
        let key_bytes = self
            .credentials
            .retrieve(&Self::credential_id(table_id))
            .expect("credential store")
            .expect("assigned key present");
        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        let master = MasterKey::from_bytes(key);
        CameraToken::seal(
            &master,
            table_id,
            key_index,
            self.keys_per_table,
            TokenNonce::generate(),
            &self.fingerprint,
        )
        .expect("index drawn in range")
    }
}

/// External-ledger stand-in: stores posted roots in memory and serves them
/// back by reference. Injectable transient failures for backoff tests.
#[derive(Default)]
pub struct InMemoryLedger {
    roots: Mutex<HashMap<String, MerkleRoot>>,
    failures_left: AtomicU32,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `post_root` calls fail as retryable.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Number of roots the ledger holds.
    pub fn root_count(&self) -> usize {
        self.roots.lock().unwrap().len()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn post_root(
        &self,
        batch_id: BatchId,
        root: &MerkleRoot,
    ) -> Result<LedgerRef, PublishError> {
        let injected = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(PublishError::Retryable("injected outage".into()));
        }
        let reference = LedgerRef::new(format!("inmem/{batch_id}"));
        let mut roots = self.roots.lock().unwrap();
        roots.insert(reference.as_str().to_string(), *root);
        Ok(reference)
    }

    async fn fetch_root(&self, ledger_ref: &LedgerRef) -> Result<Option<MerkleRoot>, PublishError> {
        let roots = self.roots.lock().unwrap();
        Ok(roots.get(ledger_ref.as_str()).copied())
    }
}

/// A provisioned deployment: three master key tables, one registered camera.
pub struct DeploymentFixture {
    pub keys_per_table: u32,
    table_keys: Vec<(TableId, [u8; 32], TableStatus)>,
    device_id: DeviceId,
    fingerprint: FingerprintHash,
    assignment: TableAssignment,
    rng_seed: [u8; 32],
}

impl DeploymentFixture {
    /// Provision from OS randomness.
    pub fn new() -> Self {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        Self::with_seed(seed)
    }

    /// Provision deterministically from a seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let mut rng = StdRng::from_seed(seed);
        let table_keys = (1u32..=3)
            .map(|id| {
                let mut key = [0u8; 32];
                rng.fill_bytes(&mut key);
                (TableId(id), key, TableStatus::Active)
            })
            .collect::<Vec<_>>();
        let mut fp = [0u8; 32];
        rng.fill_bytes(&mut fp);
        let assignment =
            TableAssignment::new([TableId(1), TableId(2), TableId(3)]).expect("distinct ids");
        Self {
            keys_per_table: FIXTURE_KEYS_PER_TABLE,
            table_keys,
            device_id: DeviceId("camera-0001".to_string()),
            fingerprint: FingerprintHash::from_bytes(fp),
            assignment,
            rng_seed: seed,
        }
    }

    /// Mark one table retired before loading the key table store.
    pub fn retire_table(&mut self, table_id: TableId) {
        for (id, _, status) in &mut self.table_keys {
            if *id == table_id {
                *status = TableStatus::Retired;
            }
        }
    }

    /// The provisioned fingerprint of the fixture's camera.
    pub fn fingerprint(&self) -> FingerprintHash {
        self.fingerprint
    }

    /// Build the authority-side key table store.
    pub fn key_table_store(&self) -> KeyTableStore {
        let records = self
            .table_keys
            .iter()
            .map(|(table_id, key, status)| {
                MasterKeyTable {
                    table_id: *table_id,
                    master_key: MasterKey::from_bytes(*key),
                    status: *status,
                }
                .provision()
            })
            .collect();
        KeyTableStore::load(records).expect("freshly provisioned records verify")
    }

    /// Build a registry with the fixture's camera registered.
    pub async fn registry(&self) -> Arc<MemoryDeviceRegistry> {
        let registry = Arc::new(MemoryDeviceRegistry::new());
        registry
            .register(DeviceRecord {
                device_id: self.device_id.clone(),
                fingerprint_hash: self.fingerprint,
                assignment: self.assignment,
            })
            .await
            .expect("empty registry accepts the first device");
        registry
    }

    /// Build the software camera, keys loaded into its credential store.
    pub fn camera(&self) -> CameraDevice {
        let credentials = MemoryCredentialStore::new();
        for (table_id, key, _) in &self.table_keys {
            credentials
                .store(&CameraDevice::credential_id(*table_id), key)
                .expect("memory store");
        }
        // Offset so the camera's draws differ from provisioning randomness.
        let mut camera_seed = self.rng_seed;
        camera_seed[0] ^= 0xA5;
        CameraDevice {
            device_id: self.device_id.clone(),
            fingerprint: self.fingerprint,
            assignment: self.assignment,
            credentials,
            selector: TokenSelector::new(self.keys_per_table),
            keys_per_table: self.keys_per_table,
            rng: Mutex::new(StdRng::from_seed(camera_seed)),
        }
    }

    /// Fresh empty batch store.
    pub fn batch_store(&self) -> Arc<MemoryBatchStore> {
        Arc::new(MemoryBatchStore::new())
    }

    /// Fresh in-memory external ledger.
    pub fn ledger(&self) -> Arc<InMemoryLedger> {
        Arc::new(InMemoryLedger::new())
    }

    /// A second camera with the same assignment but an unregistered
    /// fingerprint, for rejection tests.
    pub fn rogue_camera(&self) -> CameraDevice {
        let mut rng = StdRng::from_seed(self.rng_seed);
        let mut skip = [0u8; 32];
        // Burn the provisioning draws so the rogue fingerprint is fresh.
        for _ in 0..4 {
            rng.fill_bytes(&mut skip);
        }
        let mut fp = [0u8; 32];
        rng.fill_bytes(&mut fp);

        let camera = self.camera();
        CameraDevice {
            device_id: DeviceId("camera-rogue".to_string()),
            fingerprint: FingerprintHash::from_bytes(fp),
            ..camera
        }
    }
}

impl Default for DeploymentFixture {
    fn default() -> Self {
        Self::new()
    }
}
