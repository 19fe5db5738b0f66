//! Core ledger functionality
//!
//! Blocks, transactions, the append-only ledger, the pluggable digest and the
//! proof-of-work collaborator that gates block creation under the gated policy.

pub mod block;
pub mod digest;
pub mod ledger;
pub mod merkle;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
pub use digest::{BlockDigest, DigestKind, Sha256Digest, SimpleDigest};
pub use ledger::{validate_chain, BlockTemplate, Ledger};
pub use merkle::merkle_root;
pub use proof_of_work::{
    BlockPolicy, PolicyKind, ProofOfWork, DEFAULT_POW_DIFFICULTY, MAX_POW_DIFFICULTY,
};
pub use transaction::Transaction;
