//! The authority validator.
//!
//! Stateless beyond reads of the key table store and device registry, so it
//! runs fully in parallel across concurrent requests. Its contract never
//! includes the image hash anywhere - the privacy invariant of the whole
//! protocol is that compromise of the validator (or its logs) reveals
//! nothing about which images a device produced.

use std::sync::Arc;

use aperture_core::{CameraToken, CoreError, TokenCipher};
use aperture_store::{DeviceRegistry, KeyTableStore, StoreError, TableStatus};

use crate::error::Result;

/// Reason a token failed validation.
///
/// Tag mismatch and unknown device both surface as
/// [`FailReason::AuthenticationFailure`]: distinguishing them would give an
/// attacker a decryption oracle. Table id and key index travel in the clear,
/// so their failures are safe to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// No such key table is provisioned.
    UnknownTable,
    /// Table is retired and this deployment disables retired-table
    /// validation.
    TableRetired,
    /// Key index outside the deployment's domain.
    InvalidIndex,
    /// Decryption or device match failed.
    AuthenticationFailure,
}

/// Result of validating one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The token decrypts to a registered device's fingerprint.
    Pass,
    /// The token is not acceptable. Never partial credit.
    Fail(FailReason),
}

impl ValidationOutcome {
    /// Whether the token passed.
    pub const fn passed(self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }
}

/// Validates camera tokens against the key tables and device registry.
pub struct AuthorityValidator {
    tables: Arc<KeyTableStore>,
    registry: Arc<dyn DeviceRegistry>,
    keys_per_table: u32,
    allow_retired_tables: bool,
}

impl AuthorityValidator {
    /// Create a validator over loaded key tables and a device registry.
    pub fn new(
        tables: Arc<KeyTableStore>,
        registry: Arc<dyn DeviceRegistry>,
        keys_per_table: u32,
        allow_retired_tables: bool,
    ) -> Self {
        Self {
            tables,
            registry,
            keys_per_table,
            allow_retired_tables,
        }
    }

    /// Validate one token: table lookup, key derivation, AEAD decrypt,
    /// registry match.
    ///
    /// Cryptographic failures are verdicts, not errors; `Err` is reserved
    /// for infrastructure faults (e.g. a failing registry backend).
    pub async fn validate(&self, token: &CameraToken) -> Result<ValidationOutcome> {
        let table = match self.tables.lookup(token.table_id) {
            Ok(table) => table,
            Err(StoreError::UnknownTable(_)) => {
                return Ok(ValidationOutcome::Fail(FailReason::UnknownTable));
            }
            Err(e) => return Err(e.into()),
        };

        if table.status == TableStatus::Retired && !self.allow_retired_tables {
            return Ok(ValidationOutcome::Fail(FailReason::TableRetired));
        }

        let derived = match table.master_key.derive(token.key_index, self.keys_per_table) {
            Ok(key) => key,
            Err(CoreError::InvalidIndex { .. }) => {
                return Ok(ValidationOutcome::Fail(FailReason::InvalidIndex));
            }
            Err(e) => return Err(e.into()),
        };

        let fingerprint = match TokenCipher::decrypt(
            &derived,
            &token.nonce,
            token.table_id,
            token.key_index,
            &token.ciphertext,
            &token.auth_tag,
        ) {
            Ok(fp) => fp,
            Err(_) => {
                tracing::debug!(table = %token.table_id, "token failed authentication");
                return Ok(ValidationOutcome::Fail(FailReason::AuthenticationFailure));
            }
        };

        match self.registry.lookup_by_fingerprint(&fingerprint).await? {
            Some(_) => Ok(ValidationOutcome::Pass),
            None => {
                // Same outward verdict as a tag mismatch.
                tracing::debug!(table = %token.table_id, "decrypted fingerprint matches no device");
                Ok(ValidationOutcome::Fail(FailReason::AuthenticationFailure))
            }
        }
    }
}
