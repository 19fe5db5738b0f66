use crate::core::{merkle_root, BlockDigest, Transaction};
use crate::error::Result;
use crate::utils::{current_timestamp, serialize};
use serde::{Deserialize, Serialize};

/// Previous-hash sentinel carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Genesis timestamp; fixed so that every node starts from the same block.
pub const GENESIS_TIMESTAMP: i64 = 0;

/// An immutable link in the chain.
///
/// `hash` is computed once at construction from `previous_hash`,
/// `transactions` and `timestamp`; fields are private and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: i64,
    previous_hash: String,
    transactions: Vec<Transaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof: Option<u64>,
    hash: String,
}

impl Block {
    /// Build a block stamped with the current wall-clock time.
    pub fn new_block(
        previous_hash: String,
        transactions: Vec<Transaction>,
        proof: Option<u64>,
        digest: &dyn BlockDigest,
    ) -> Result<Block> {
        Self::with_timestamp(
            current_timestamp()?,
            previous_hash,
            transactions,
            proof,
            digest,
        )
    }

    pub fn with_timestamp(
        timestamp: i64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        proof: Option<u64>,
        digest: &dyn BlockDigest,
    ) -> Result<Block> {
        let hash = Self::calculate_hash(timestamp, &previous_hash, &transactions, digest)?;
        Ok(Block {
            timestamp,
            previous_hash,
            transactions,
            proof,
            hash,
        })
    }

    pub fn generate_genesis_block(proof: Option<u64>, digest: &dyn BlockDigest) -> Result<Block> {
        Self::with_timestamp(
            GENESIS_TIMESTAMP,
            String::from(GENESIS_PREVIOUS_HASH),
            vec![],
            proof,
            digest,
        )
    }

    fn calculate_hash(
        timestamp: i64,
        previous_hash: &str,
        transactions: &[Transaction],
        digest: &dyn BlockDigest,
    ) -> Result<String> {
        let mut data = Vec::new();
        data.extend(previous_hash.as_bytes());
        data.extend(serialize(transactions)?);
        data.extend(timestamp.to_string().as_bytes());
        Ok(digest.digest(data.as_slice()))
    }

    /// Recompute the hash from the other fields.
    pub fn recompute_hash(&self, digest: &dyn BlockDigest) -> Result<String> {
        Self::calculate_hash(
            self.timestamp,
            &self.previous_hash,
            &self.transactions,
            digest,
        )
    }

    pub fn has_valid_hash(&self, digest: &dyn BlockDigest) -> bool {
        matches!(self.recompute_hash(digest), Ok(hash) if hash == self.hash)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_proof(&self) -> Option<u64> {
        self.proof
    }

    /// Merkle root of the transactions. Not part of the block hash and never
    /// sent on the wire.
    pub fn merkle_root(&self, digest: &dyn BlockDigest) -> Result<Option<String>> {
        merkle_root(&self.transactions, digest)
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash == GENESIS_PREVIOUS_HASH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Sha256Digest, SimpleDigest};

    fn sample_block() -> Block {
        Block::with_timestamp(
            1_700_000_000_000,
            "abc".to_string(),
            vec![Transaction::new("Alice", "Bob", 10)],
            None,
            &Sha256Digest,
        )
        .unwrap()
    }

    #[test]
    fn test_genesis_block_shape() {
        let genesis = Block::generate_genesis_block(None, &Sha256Digest).unwrap();
        assert_eq!(genesis.get_previous_hash(), "0");
        assert!(genesis.get_transactions().is_empty());
        assert!(genesis.is_genesis());
        assert!(genesis.has_valid_hash(&Sha256Digest));
    }

    #[test]
    fn test_genesis_is_identical_across_instances() {
        let a = Block::generate_genesis_block(None, &Sha256Digest).unwrap();
        let b = Block::generate_genesis_block(None, &Sha256Digest).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_is_pure_function_of_fields() {
        let block = sample_block();
        assert_eq!(block.recompute_hash(&Sha256Digest).unwrap(), block.get_hash());
        assert_eq!(sample_block().get_hash(), block.get_hash());
    }

    #[test]
    fn test_changing_any_field_changes_hash() {
        let base = sample_block();
        let other_time = Block::with_timestamp(
            1_700_000_000_001,
            "abc".to_string(),
            vec![Transaction::new("Alice", "Bob", 10)],
            None,
            &Sha256Digest,
        )
        .unwrap();
        let other_prev = Block::with_timestamp(
            1_700_000_000_000,
            "abd".to_string(),
            vec![Transaction::new("Alice", "Bob", 10)],
            None,
            &Sha256Digest,
        )
        .unwrap();
        let other_tx = Block::with_timestamp(
            1_700_000_000_000,
            "abc".to_string(),
            vec![Transaction::new("Alice", "Bob", 11)],
            None,
            &Sha256Digest,
        )
        .unwrap();

        assert_ne!(base.get_hash(), other_time.get_hash());
        assert_ne!(base.get_hash(), other_prev.get_hash());
        assert_ne!(base.get_hash(), other_tx.get_hash());
    }

    #[test]
    fn test_tampered_block_fails_hash_check() {
        let block = sample_block();
        let mut json = serde_json::to_value(&block).unwrap();
        json["transactions"][0]["amount"] = serde_json::json!(1000);
        let tampered: Block = serde_json::from_value(json).unwrap();
        assert!(!tampered.has_valid_hash(&Sha256Digest));
    }

    #[test]
    fn test_hash_depends_on_digest() {
        let block = sample_block();
        assert!(!block.has_valid_hash(&SimpleDigest));
    }

    #[test]
    fn test_wire_shape_omits_missing_proof() {
        let json = serde_json::to_value(sample_block()).unwrap();
        let object = json.as_object().unwrap();
        assert!(object.contains_key("previous_hash"));
        assert!(object.contains_key("timestamp"));
        assert!(object.contains_key("transactions"));
        assert!(object.contains_key("hash"));
        assert!(!object.contains_key("proof"));
        assert!(!object.contains_key("merkle_root"));
    }

    #[test]
    fn test_merkle_root_covers_transactions_only() {
        let block = sample_block();
        let root = block.merkle_root(&Sha256Digest).unwrap();
        assert!(root.is_some());
        assert_ne!(root.as_deref(), Some(block.get_hash()));

        let genesis = Block::generate_genesis_block(None, &Sha256Digest).unwrap();
        assert_eq!(genesis.merkle_root(&Sha256Digest).unwrap(), None);
    }
}
