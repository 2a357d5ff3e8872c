//! Capture-side (table, key index) selection.
//!
//! Each capture independently draws one of the device's three assigned
//! tables and a uniform key index. Independence across captures is the
//! unlinkability mechanism: no counters, no sequential indexing, no state.

use rand::Rng;

use crate::error::CoreError;
use crate::types::{KeyIndex, TableId};

/// The three distinct tables assigned to a device at provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableAssignment {
    tables: [TableId; 3],
}

impl TableAssignment {
    /// Create an assignment; the three tables must be distinct.
    pub fn new(tables: [TableId; 3]) -> Result<Self, CoreError> {
        if tables[0] == tables[1] || tables[0] == tables[2] || tables[1] == tables[2] {
            return Err(CoreError::InvalidAssignment(format!(
                "assigned tables must be distinct, got {:?}",
                tables
            )));
        }
        Ok(Self { tables })
    }

    /// The assigned table ids.
    pub fn tables(&self) -> &[TableId; 3] {
        &self.tables
    }

    /// Whether a table is part of this assignment.
    pub fn contains(&self, table_id: TableId) -> bool {
        self.tables.contains(&table_id)
    }
}

/// Stateless uniform selection policy.
#[derive(Debug, Clone, Copy)]
pub struct TokenSelector {
    keys_per_table: u32,
}

impl TokenSelector {
    /// Create a selector for a deployment's key-index domain.
    pub fn new(keys_per_table: u32) -> Self {
        Self { keys_per_table }
    }

    /// Draw a (table, key index) pair for one capture.
    pub fn select(&self, assignment: &TableAssignment) -> (TableId, KeyIndex) {
        self.select_with_rng(assignment, &mut rand::thread_rng())
    }

    /// Draw with a caller-supplied RNG (deterministic tests).
    pub fn select_with_rng<R: Rng>(
        &self,
        assignment: &TableAssignment,
        rng: &mut R,
    ) -> (TableId, KeyIndex) {
        let table = assignment.tables()[rng.gen_range(0..3)];
        let index = KeyIndex(rng.gen_range(0..self.keys_per_table));
        (table, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn assignment() -> TableAssignment {
        TableAssignment::new([TableId(1), TableId(2), TableId(3)]).unwrap()
    }

    #[test]
    fn test_duplicate_tables_rejected() {
        let err = TableAssignment::new([TableId(1), TableId(1), TableId(2)]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAssignment(_)));
    }

    #[test]
    fn test_selection_stays_in_assignment() {
        let selector = TokenSelector::new(100);
        let assignment = assignment();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let (table, index) = selector.select_with_rng(&assignment, &mut rng);
            assert!(assignment.contains(table));
            assert!(index.0 < 100);
        }
    }

    // Uniformity sanity check over 1,000 captures: no (table, index) pair
    // should repeat much beyond the expected ceil(1000 / (3 * k)) rate.
    #[test]
    fn test_selection_uniformity() {
        let keys_per_table = 100u32;
        let captures = 1000usize;
        let selector = TokenSelector::new(keys_per_table);
        let assignment = assignment();
        let mut rng = StdRng::seed_from_u64(42);

        let mut counts: HashMap<(TableId, KeyIndex), usize> = HashMap::new();
        let mut table_counts: HashMap<TableId, usize> = HashMap::new();
        for _ in 0..captures {
            let pair = selector.select_with_rng(&assignment, &mut rng);
            *counts.entry(pair).or_default() += 1;
            *table_counts.entry(pair.0).or_default() += 1;
        }

        let expected = captures.div_ceil(3 * keys_per_table as usize);
        let tolerance = 6;
        for (pair, count) in &counts {
            assert!(
                *count <= expected + tolerance,
                "pair {pair:?} selected {count} times (expected at most {})",
                expected + tolerance
            );
        }

        // No degenerate table bias: every assigned table gets used.
        for table in assignment.tables() {
            assert!(table_counts.get(table).copied().unwrap_or(0) > captures / 6);
        }
    }
}
