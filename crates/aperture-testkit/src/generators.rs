//! Proptest generators for property-based testing.

use proptest::prelude::*;

use aperture_core::{
    FingerprintHash, ImageHash, KeyIndex, MasterKey, TableAssignment, TableId, TokenNonce,
    TransactionId,
};
use aperture_ledger::ModificationLevel;

/// Generate a random ImageHash.
pub fn image_hash() -> impl Strategy<Value = ImageHash> {
    any::<[u8; 32]>().prop_map(ImageHash::from_bytes)
}

/// Generate a random FingerprintHash.
pub fn fingerprint_hash() -> impl Strategy<Value = FingerprintHash> {
    any::<[u8; 32]>().prop_map(FingerprintHash::from_bytes)
}

/// Generate a random MasterKey.
pub fn master_key() -> impl Strategy<Value = MasterKey> {
    any::<[u8; 32]>().prop_map(MasterKey::from_bytes)
}

/// Generate a random token nonce.
pub fn token_nonce() -> impl Strategy<Value = TokenNonce> {
    any::<[u8; 12]>().prop_map(TokenNonce::from_bytes)
}

/// Generate a table id.
pub fn table_id() -> impl Strategy<Value = TableId> {
    (1u32..=1000).prop_map(TableId)
}

/// Generate a key index within `keys_per_table`.
pub fn key_index(keys_per_table: u32) -> impl Strategy<Value = KeyIndex> {
    (0..keys_per_table).prop_map(KeyIndex)
}

/// Generate a three-table assignment with distinct ids.
pub fn table_assignment() -> impl Strategy<Value = TableAssignment> {
    (1u32..=1000).prop_map(|base| {
        TableAssignment::new([TableId(base), TableId(base + 1), TableId(base + 2)])
            .expect("consecutive ids are distinct")
    })
}

/// Generate a transaction id.
pub fn transaction_id() -> impl Strategy<Value = TransactionId> {
    "[a-f0-9]{16}".prop_map(TransactionId)
}

/// Generate a modification level.
pub fn modification_level() -> impl Strategy<Value = ModificationLevel> {
    prop_oneof![
        Just(ModificationLevel::Original),
        Just(ModificationLevel::Adjusted),
        Just(ModificationLevel::Composite),
    ]
}

/// Generate a batch of 1..=max distinct image hashes.
pub fn leaf_batch(max: usize) -> impl Strategy<Value = Vec<ImageHash>> {
    prop::collection::btree_set(any::<[u8; 32]>(), 1..=max)
        .prop_map(|set| set.into_iter().map(ImageHash::from_bytes).collect())
}
