//! The master key table store.
//!
//! Process-wide state with an init-once lifecycle: tables are loaded from a
//! provisioned source at startup, checksum-verified, and never mutated while
//! serving. Rotation creates a new table id rather than touching an existing
//! entry; retirement only stops new device assignment, so retired tables keep
//! validating the devices already holding them.

use std::collections::HashMap;

use aperture_core::{MasterKey, TableId};

use crate::error::{Result, StoreError};

/// Lifecycle status of a master key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    /// Eligible for new device assignment and validation.
    Active,
    /// No new assignments; existing devices still validate.
    Retired,
}

impl TableStatus {
    fn checksum_byte(self) -> u8 {
        match self {
            TableStatus::Active => 0,
            TableStatus::Retired => 1,
        }
    }
}

/// One provisioned master key table.
#[derive(Debug, Clone)]
pub struct MasterKeyTable {
    pub table_id: TableId,
    pub master_key: MasterKey,
    pub status: TableStatus,
}

impl MasterKeyTable {
    /// Integrity checksum over the entry:
    /// `blake3(table_id BE ‖ status byte ‖ master_key)`.
    pub fn checksum(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.table_id.to_be_bytes());
        hasher.update(&[self.status.checksum_byte()]);
        hasher.update(self.master_key.as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Wrap into a provisioning record with its checksum attached.
    pub fn provision(self) -> ProvisionedTable {
        let checksum = self.checksum();
        ProvisionedTable {
            table: self,
            checksum,
        }
    }
}

/// A table as delivered by the provisioning source: entry plus checksum.
#[derive(Debug, Clone)]
pub struct ProvisionedTable {
    pub table: MasterKeyTable,
    pub checksum: [u8; 32],
}

/// Immutable-after-load mapping of table id to master key table.
pub struct KeyTableStore {
    tables: HashMap<TableId, ProvisionedTable>,
}

impl KeyTableStore {
    /// Load and verify provisioned tables.
    ///
    /// Fails with [`StoreError::CorruptTableData`] on any checksum mismatch
    /// or duplicate table id, before any lookup can be served.
    pub fn load(records: Vec<ProvisionedTable>) -> Result<Self> {
        let mut tables = HashMap::with_capacity(records.len());
        for record in records {
            let expected = record.table.checksum();
            if expected != record.checksum {
                tracing::error!(table = %record.table.table_id, "key table checksum mismatch");
                return Err(StoreError::CorruptTableData(format!(
                    "checksum mismatch for {}",
                    record.table.table_id
                )));
            }
            if tables.insert(record.table.table_id, record).is_some() {
                return Err(StoreError::CorruptTableData(
                    "duplicate table id in provisioned data".to_string(),
                ));
            }
        }
        let store = Self { tables };
        store.verify()?;
        Ok(store)
    }

    /// Look up a table by id.
    pub fn lookup(&self, table_id: TableId) -> Result<&MasterKeyTable> {
        self.tables
            .get(&table_id)
            .map(|r| &r.table)
            .ok_or(StoreError::UnknownTable(table_id))
    }

    /// Recompute every entry's checksum against the provisioned value.
    pub fn verify(&self) -> Result<()> {
        for record in self.tables.values() {
            if record.table.checksum() != record.checksum {
                return Err(StoreError::CorruptTableData(format!(
                    "checksum mismatch for {}",
                    record.table.table_id
                )));
            }
        }
        Ok(())
    }

    /// Number of loaded tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no tables are loaded.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// All loaded table ids (for provisioning tooling).
    pub fn table_ids(&self) -> impl Iterator<Item = TableId> + '_ {
        self.tables.keys().copied()
    }
}
