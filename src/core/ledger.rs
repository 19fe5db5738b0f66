// The in-memory, append-only chain replicated by every node.
// The ledger itself is not synchronised: the node wraps it in a lock and every
// mutation goes through `try_append` while that lock is held.

use crate::core::{Block, BlockDigest, BlockPolicy, Transaction, GENESIS_PREVIOUS_HASH};
use crate::error::{BlockchainError, Result};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

pub struct Ledger {
    chain: Vec<Block>,
    digest: Arc<dyn BlockDigest>,
    policy: BlockPolicy,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("len", &self.chain.len())
            .field("digest", &self.digest.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl Ledger {
    /// Create a ledger and append the genesis block.
    pub fn new(digest: Arc<dyn BlockDigest>, policy: BlockPolicy) -> Result<Ledger> {
        let mut ledger = Ledger {
            chain: Vec::new(),
            digest,
            policy,
        };
        let genesis = Block::generate_genesis_block(policy.genesis_proof(), ledger.digest())?;
        ledger.try_append(genesis)?;
        info!("Ledger initialised with genesis block {}", ledger.tip_hash());
        Ok(ledger)
    }

    pub fn digest(&self) -> &dyn BlockDigest {
        self.digest.as_ref()
    }

    pub fn policy(&self) -> BlockPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn tip(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Hash of the tip, or the genesis sentinel on an empty chain.
    pub fn tip_hash(&self) -> String {
        self.tip()
            .map(|block| block.get_hash().to_string())
            .unwrap_or_else(|| GENESIS_PREVIOUS_HASH.to_string())
    }

    /// Append `block` iff it extends the current tip, recomputes to its own
    /// hash, and satisfies the block policy. The chain is untouched on error.
    pub fn try_append(&mut self, block: Block) -> Result<()> {
        if !block.has_valid_hash(self.digest()) {
            return Err(BlockchainError::InvalidBlock(format!(
                "hash {} does not match block contents",
                block.get_hash()
            )));
        }

        if let Some(tip) = self.chain.last() {
            if block.get_previous_hash() != tip.get_hash() {
                return Err(BlockchainError::Link {
                    expected: tip.get_hash().to_string(),
                    found: block.get_previous_hash().to_string(),
                });
            }
            self.policy.check(tip.get_proof(), block.get_proof())?;
        }

        self.chain.push(block);
        Ok(())
    }

    pub fn append_if_linkable(&mut self, block: Block) -> bool {
        let hash = block.get_hash().to_string();
        match self.try_append(block) {
            Ok(()) => true,
            Err(e) => {
                debug!("Rejected block {hash}: {e}");
                false
            }
        }
    }

    /// Build (and, under the gated policy, mine) a block on top of the tip.
    /// The block is not appended.
    pub fn new_block(&self, transactions: Vec<Transaction>) -> Result<Block> {
        self.template().build(transactions)
    }

    /// Everything needed to build a block on the current tip, detached from
    /// the ledger so mining can run without holding the node lock.
    pub fn template(&self) -> BlockTemplate {
        BlockTemplate {
            previous_hash: self.tip_hash(),
            last_proof: self.tip().and_then(Block::get_proof),
            policy: self.policy,
            digest: Arc::clone(&self.digest),
        }
    }

    /// Replay every transaction in chain order. Accounts start at zero.
    pub fn balance_of(&self, account: &str) -> i64 {
        self.chain
            .iter()
            .flat_map(|block| block.get_transactions())
            .fold(0i64, |balance, tx| balance.saturating_add(tx.delta_for(account)))
    }

    /// Owned copy of the chain, detached from later appends.
    pub fn snapshot(&self) -> Vec<Block> {
        self.chain.clone()
    }

    pub fn blocks(&self) -> &[Block] {
        self.chain.as_slice()
    }

    pub fn is_valid(&self) -> bool {
        validate_chain(&self.chain, self.digest()).is_ok()
    }
}

/// Snapshot of a tip to build the next block on. The block it builds is
/// rejected with [`BlockchainError::Link`] if the tip has moved meanwhile.
pub struct BlockTemplate {
    previous_hash: String,
    last_proof: Option<u64>,
    policy: BlockPolicy,
    digest: Arc<dyn BlockDigest>,
}

impl BlockTemplate {
    pub fn previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn build(&self, transactions: Vec<Transaction>) -> Result<Block> {
        let proof = self.policy.next_proof(self.last_proof);
        Block::new_block(
            self.previous_hash.clone(),
            transactions,
            proof,
            self.digest.as_ref(),
        )
    }
}

/// Check linkage and self-consistency over a whole chain, e.g. one received
/// from a peer.
pub fn validate_chain(blocks: &[Block], digest: &dyn BlockDigest) -> Result<()> {
    for (i, block) in blocks.iter().enumerate() {
        if !block.has_valid_hash(digest) {
            return Err(BlockchainError::InvalidBlock(format!(
                "block {i} hash {} does not match its contents",
                block.get_hash()
            )));
        }
        if i == 0 {
            continue;
        }
        let previous = &blocks[i - 1];
        if block.get_previous_hash() != previous.get_hash() {
            return Err(BlockchainError::Link {
                expected: previous.get_hash().to_string(),
                found: block.get_previous_hash().to_string(),
            });
        }
    }
    Ok(())
}
