//! The device registry: provisioned devices, looked up by fingerprint hash.
//!
//! Records are created once at provisioning and read-only afterward. The
//! validator's only registry operation is the fingerprint lookup in step (4)
//! of token validation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use aperture_core::{DeviceId, FingerprintHash, TableAssignment};

use crate::error::{Result, StoreError};

/// A provisioned device.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub fingerprint_hash: FingerprintHash,
    pub assignment: TableAssignment,
}

/// Async lookup interface over the provisioned device set.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Find the device whose fingerprint hash matches, if any.
    async fn lookup_by_fingerprint(&self, fp: &FingerprintHash) -> Result<Option<DeviceRecord>>;

    /// Register a device at provisioning time.
    async fn register(&self, record: DeviceRecord) -> Result<()>;
}

/// In-memory registry. Thread-safe via RwLock.
pub struct MemoryDeviceRegistry {
    devices: RwLock<HashMap<FingerprintHash, DeviceRecord>>,
}

impl MemoryDeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryDeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRegistry for MemoryDeviceRegistry {
    async fn lookup_by_fingerprint(&self, fp: &FingerprintHash) -> Result<Option<DeviceRecord>> {
        let devices = self.devices.read().unwrap();
        Ok(devices.get(fp).cloned())
    }

    async fn register(&self, record: DeviceRecord) -> Result<()> {
        let mut devices = self.devices.write().unwrap();
        if devices.contains_key(&record.fingerprint_hash) {
            return Err(StoreError::DuplicateDevice(record.device_id.0));
        }
        devices.insert(record.fingerprint_hash, record);
        Ok(())
    }
}
