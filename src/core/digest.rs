//! Pluggable block digests
//!
//! The ledger never assumes collision resistance: a digest only has to change
//! (with high probability) when any hashed field changes.

use crate::error::BlockchainError;
use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub trait BlockDigest: Send + Sync {
    fn name(&self) -> &'static str;
    fn digest(&self, data: &[u8]) -> String;
}

/// SHA-256, lower-case hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl BlockDigest for Sha256Digest {
    fn name(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, data: &[u8]) -> String {
        sha256_hex(data)
    }
}

/// Toy 32-bit position-weighted string hash, rendered in decimal.
///
/// Each character contributes `code_point * (index + 1)` and the running value
/// is multiplied by 31 after every step. Not cryptographic.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleDigest;

const SIMPLE_PRIME: u32 = 31;

impl BlockDigest for SimpleDigest {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn digest(&self, data: &[u8]) -> String {
        let text = String::from_utf8_lossy(data);
        let mut hash_value: u32 = 0;
        for (i, ch) in text.chars().enumerate() {
            let weight = (i as u32).wrapping_add(1);
            hash_value = hash_value.wrapping_add((ch as u32).wrapping_mul(weight));
            hash_value = hash_value.wrapping_mul(SIMPLE_PRIME);
        }
        hash_value.to_string()
    }
}

/// Digest selector used by configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    #[default]
    Sha256,
    Simple,
}

impl DigestKind {
    pub fn build(self) -> Arc<dyn BlockDigest> {
        match self {
            DigestKind::Sha256 => Arc::new(Sha256Digest),
            DigestKind::Simple => Arc::new(SimpleDigest),
        }
    }
}

impl FromStr for DigestKind {
    type Err = BlockchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" => Ok(DigestKind::Sha256),
            "simple" => Ok(DigestKind::Simple),
            _ => Err(BlockchainError::Config(format!(
                "Invalid digest: {s}. Valid options: sha256, simple"
            ))),
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestKind::Sha256 => write!(f, "sha256"),
            DigestKind::Simple => write!(f, "simple"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_digest_known_values() {
        // "a": (97 * 1) * 31
        assert_eq!(SimpleDigest.digest(b"a"), "3007");
        // "ab": ((97 * 31) + 98 * 2) * 31
        assert_eq!(SimpleDigest.digest(b"ab"), ((97 * 31 + 196) * 31).to_string());
        assert_eq!(SimpleDigest.digest(b""), "0");
    }

    #[test]
    fn test_simple_digest_stays_within_32_bits() {
        let long = "x".repeat(10_000);
        let value: u64 = SimpleDigest.digest(long.as_bytes()).parse().unwrap();
        assert!(value <= u32::MAX as u64);
    }

    #[test]
    fn test_digests_change_with_input() {
        for kind in [DigestKind::Sha256, DigestKind::Simple] {
            let digest = kind.build();
            assert_ne!(digest.digest(b"block-1"), digest.digest(b"block-2"));
        }
    }

    #[test]
    fn test_digest_kind_parsing() {
        assert_eq!("SHA256".parse::<DigestKind>().unwrap(), DigestKind::Sha256);
        assert_eq!("simple".parse::<DigestKind>().unwrap(), DigestKind::Simple);
        assert!("md5".parse::<DigestKind>().is_err());
    }
}
