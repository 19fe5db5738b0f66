//! Utility functions and helpers
//!
//! Hashing, timestamps, the ECDSA signing collaborator and the JSON helpers
//! shared by the ledger and the wire codec.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    current_timestamp, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify,
    new_key_pair, public_key, sha256_digest, sha256_hex,
};

pub use serialization::{deserialize, serialize};
