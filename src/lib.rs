//! # Gossip Chain - a minimal replicated ledger node
//!
//! Each node keeps an in-memory, append-only chain and gossips blocks to the
//! peers it knows about. Nodes talk over one-shot TCP connections carrying a
//! single JSON message each.
//!
//! ## How the code is organized
//! - `core/`: blocks, transactions, the ledger, digests and proof-of-work
//! - `network/`: wire codec, peer registry, broadcaster, listener and client
//! - `node/`: the composition root that owns the shared state
//! - `config/`: TOML and environment configuration
//! - `error/`: the error taxonomy shared by every layer
//! - `utils/`: hashing, timestamps and the signing collaborator
//! - `cli/`: command-line interface for the binary
//!
//! ## Replication model
//! A block is appended iff its previous hash matches the local tip. There is
//! no fork choice and no reorg: the first linkable block wins and anything else
//! is dropped. Gossip is best effort and at most once per hop.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod node;
pub mod utils;

pub use cli::{Command, Opt};
pub use config::{Config, DEFAULT_PORT};
pub use core::{
    validate_chain, Block, BlockDigest, BlockPolicy, DigestKind, Ledger, PolicyKind,
    ProofOfWork, Sha256Digest, SimpleDigest, Transaction,
};
pub use error::{BlockchainError, Result};
pub use network::{Broadcaster, ConnectionHandler, Message, PeerRegistry, Server};
pub use node::{Node, RunningNode};
pub use utils::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, sha256_digest,
};
