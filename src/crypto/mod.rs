//! Crypto Module
//!
//! Narrow interface over the signature and hash primitives:
//! - key decoding and public key derivation
//! - SHA3-256 hashing of payloads and reduced payloads
//! - ed25519 signing and verification of payload hashes

mod hash;
mod keys;

pub use hash::{Signable, hash, reduced_hash, sha3_256, sign, verify};
pub use keys::{PrivateKey, PublicKey, derive_public_key};
