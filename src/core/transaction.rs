// A transfer between two opaque account identifiers.
// The wire form carries no fee and no signature; signing happens out of band
// through the ECDSA collaborator in utils::crypto.

use crate::error::Result;
use crate::utils::{
    ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, serialize, sha256_digest,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    from: String,
    to: String,
    amount: u64,
}

impl Transaction {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Transaction {
        Transaction {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    pub fn get_from(&self) -> &str {
        self.from.as_str()
    }

    pub fn get_to(&self) -> &str {
        self.to.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    /// Signed effect of this transaction on `account`'s balance.
    pub fn delta_for(&self, account: &str) -> i64 {
        let amount = i64::try_from(self.amount).unwrap_or(i64::MAX);
        let mut delta: i64 = 0;
        if self.to == account {
            delta = delta.saturating_add(amount);
        }
        if self.from == account {
            delta = delta.saturating_sub(amount);
        }
        delta
    }

    /// SHA-256 over the canonical JSON form; this is what gets signed.
    pub fn digest(&self) -> Result<Vec<u8>> {
        Ok(sha256_digest(serialize(self)?.as_slice()))
    }

    pub fn sign(&self, pkcs8: &[u8]) -> Result<Vec<u8>> {
        ecdsa_p256_sha256_sign_digest(pkcs8, self.digest()?.as_slice())
    }

    pub fn verify_signature(&self, signature: &[u8], public_key: &[u8]) -> bool {
        match self.digest() {
            Ok(digest) => ecdsa_p256_sha256_sign_verify(public_key, signature, &digest),
            Err(_) => false,
        }
    }
}
