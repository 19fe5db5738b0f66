use crate::error::{BlockchainError, Result};
use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_POW_DIFFICULTY: usize = 4;

/// A SHA-256 hex digest has 64 characters; no proof can satisfy more.
pub const MAX_POW_DIFFICULTY: usize = 64;

/// Proof carried by the genesis block under the gated policy.
pub const GENESIS_PROOF: u64 = 1;

/// Proof-of-work search over `"{last_proof}{proof}"`.
///
/// A proof is valid when the SHA-256 hex digest of the concatenation starts
/// with `difficulty` zero characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> ProofOfWork {
        ProofOfWork { difficulty }
    }

    /// Like [`ProofOfWork::new`], but refuses a difficulty no proof can meet.
    pub fn try_new(difficulty: usize) -> Result<ProofOfWork> {
        if difficulty > MAX_POW_DIFFICULTY {
            return Err(BlockchainError::Config(format!(
                "pow_difficulty {difficulty} exceeds the maximum of {MAX_POW_DIFFICULTY}"
            )));
        }
        Ok(ProofOfWork::new(difficulty))
    }

    pub fn get_difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn valid_proof(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{last_proof}{proof}");
        let hash = sha256_hex(guess.as_bytes());
        hash.len() >= self.difficulty && hash.bytes().take(self.difficulty).all(|b| b == b'0')
    }

    pub fn proof_of_work(&self, last_proof: u64) -> u64 {
        let mut proof = 0;
        while !self.valid_proof(last_proof, proof) {
            proof += 1;
        }
        proof
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_POW_DIFFICULTY)
    }
}

/// Whether a block needs a proof before the ledger accepts it.
///
/// A node picks one policy at start-up and keeps it for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockPolicy {
    #[default]
    Ungated,
    ProofOfWork(ProofOfWork),
}

impl BlockPolicy {
    pub fn genesis_proof(&self) -> Option<u64> {
        match self {
            BlockPolicy::Ungated => None,
            BlockPolicy::ProofOfWork(_) => Some(GENESIS_PROOF),
        }
    }

    /// Proof for a new block on top of a tip that carries `last_proof`.
    pub fn next_proof(&self, last_proof: Option<u64>) -> Option<u64> {
        match self {
            BlockPolicy::Ungated => None,
            BlockPolicy::ProofOfWork(pow) => {
                Some(pow.proof_of_work(last_proof.unwrap_or(GENESIS_PROOF)))
            }
        }
    }

    pub fn check(&self, last_proof: Option<u64>, proof: Option<u64>) -> Result<()> {
        match self {
            BlockPolicy::Ungated => Ok(()),
            BlockPolicy::ProofOfWork(pow) => {
                let proof = proof.ok_or_else(|| {
                    BlockchainError::InvalidProof("block carries no proof".to_string())
                })?;
                let last_proof = last_proof.unwrap_or(GENESIS_PROOF);
                if pow.valid_proof(last_proof, proof) {
                    Ok(())
                } else {
                    Err(BlockchainError::InvalidProof(format!(
                        "proof {proof} does not satisfy difficulty {} over {last_proof}",
                        pow.get_difficulty()
                    )))
                }
            }
        }
    }
}

/// Policy selector used by configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    Ungated,
    ProofOfWork,
}

impl FromStr for PolicyKind {
    type Err = BlockchainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ungated" => Ok(PolicyKind::Ungated),
            "proof-of-work" | "pow" => Ok(PolicyKind::ProofOfWork),
            _ => Err(BlockchainError::Config(format!(
                "Invalid block policy: {s}. Valid options: ungated, proof-of-work"
            ))),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::Ungated => write!(f, "ungated"),
            PolicyKind::ProofOfWork => write!(f, "proof-of-work"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_proof_is_valid() {
        let pow = ProofOfWork::new(2);
        let proof = pow.proof_of_work(GENESIS_PROOF);
        assert!(pow.valid_proof(GENESIS_PROOF, proof));
    }

    #[test]
    fn test_proof_search_is_minimal() {
        let pow = ProofOfWork::new(2);
        let proof = pow.proof_of_work(100);
        for candidate in 0..proof {
            assert!(!pow.valid_proof(100, candidate));
        }
    }

    #[test]
    fn test_zero_difficulty_accepts_everything() {
        let pow = ProofOfWork::new(0);
        assert!(pow.valid_proof(5, 12345));
        assert_eq!(pow.proof_of_work(5), 0);
    }

    #[test]
    fn test_unreachable_difficulty_is_rejected() {
        assert!(ProofOfWork::try_new(MAX_POW_DIFFICULTY).is_ok());
        assert!(matches!(
            ProofOfWork::try_new(MAX_POW_DIFFICULTY + 1),
            Err(BlockchainError::Config(_))
        ));
    }

    #[test]
    fn test_ungated_policy_ignores_proofs() {
        let policy = BlockPolicy::Ungated;
        assert_eq!(policy.genesis_proof(), None);
        assert_eq!(policy.next_proof(None), None);
        assert!(policy.check(None, None).is_ok());
    }

    #[test]
    fn test_gated_policy_requires_valid_proof() {
        let pow = ProofOfWork::new(2);
        let policy = BlockPolicy::ProofOfWork(pow);
        let proof = policy.next_proof(Some(GENESIS_PROOF));

        assert!(policy.check(Some(GENESIS_PROOF), proof).is_ok());
        assert!(matches!(
            policy.check(Some(GENESIS_PROOF), None),
            Err(BlockchainError::InvalidProof(_))
        ));

        let bad = (0..).find(|p| !pow.valid_proof(GENESIS_PROOF, *p)).unwrap();
        assert!(policy.check(Some(GENESIS_PROOF), Some(bad)).is_err());
    }

    #[test]
    fn test_policy_kind_parsing() {
        assert_eq!("pow".parse::<PolicyKind>().unwrap(), PolicyKind::ProofOfWork);
        assert_eq!("Ungated".parse::<PolicyKind>().unwrap(), PolicyKind::Ungated);
        assert!("stake".parse::<PolicyKind>().is_err());
    }
}
