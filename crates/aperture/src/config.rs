//! Configuration for the Aperture service.

use aperture_ledger::{BackoffConfig, LedgerConfig};

/// Deployment configuration.
///
/// `keys_per_table` is a protocol-wide constant for a deployment: devices
/// and validators must agree on it or index range checks diverge. Observed
/// deployments use 100 or 1000.
#[derive(Debug, Clone)]
pub struct ApertureConfig {
    /// Size of each table's derived-key index domain.
    pub keys_per_table: u32,
    /// Whether tokens from retired tables still validate. Retirement only
    /// stops new assignment; disabling this strands fielded devices, so it
    /// defaults to on.
    pub allow_retired_tables: bool,
    /// Batch trigger configuration.
    pub ledger: LedgerConfig,
    /// Publication retry backoff.
    pub backoff: BackoffConfig,
}

impl Default for ApertureConfig {
    fn default() -> Self {
        Self {
            keys_per_table: 1000,
            allow_retired_tables: true,
            ledger: LedgerConfig::default(),
            backoff: BackoffConfig::default(),
        }
    }
}
