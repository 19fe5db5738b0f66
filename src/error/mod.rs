//! Error handling for the node
//!
//! Every failure a connection, a peer, or the ledger can produce maps onto one
//! of these variants. None of them is fatal to the process.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

#[derive(Debug, Clone, PartialEq)]
pub enum BlockchainError {
    /// Malformed, truncated or unknown wire message
    Decode(String),
    /// Block does not extend the current tip
    Link { expected: String, found: String },
    /// Block fails self-consistency checks (hash mismatch, bad shape)
    InvalidBlock(String),
    /// Block is missing a proof or carries one that does not validate
    InvalidProof(String),
    /// Broadcast or request target refused or timed out
    PeerUnreachable { peer: String, reason: String },
    /// Accept/read/write failure on a single connection
    Socket(String),
    /// Configuration errors
    Config(String),
    /// Cryptographic operation errors
    Crypto(String),
    /// Serialization errors on the encode side
    Serialization(String),
    /// File I/O errors
    Io(String),
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Decode(msg) => write!(f, "Decode error: {msg}"),
            BlockchainError::Link { expected, found } => write!(
                f,
                "Link error: block links to {found}, current tip is {expected}"
            ),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidProof(msg) => write!(f, "Invalid proof: {msg}"),
            BlockchainError::PeerUnreachable { peer, reason } => {
                write!(f, "Peer {peer} unreachable: {reason}")
            }
            BlockchainError::Socket(msg) => write!(f, "Socket error: {msg}"),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            BlockchainError::Socket(err.to_string())
        } else {
            BlockchainError::Decode(err.to_string())
        }
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
