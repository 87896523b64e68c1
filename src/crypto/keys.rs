//! Ed25519 key handling
//!
//! Private keys travel as 32-byte hex seeds, public keys as 32-byte hex
//! strings. Signatures are hex-encoded 64-byte values.

use crate::error::{Error, Result};
use ed25519_dalek::{
    Signature as EdSignature, Signer, SigningKey, Verifier, VerifyingKey, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use std::fmt;

/// Private signing key
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Decode a hex seed. Surrounding whitespace is ignored so keys read
    /// from files can be passed straight in.
    pub fn from_hex(value: &str) -> Result<Self> {
        let bytes = hex::decode(value.trim())
            .map_err(|e| Error::InvalidKey(format!("private key is not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let seed: [u8; SECRET_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "private key must be {} bytes, got {}",
                SECRET_KEY_LENGTH,
                bytes.len()
            ))
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Fresh random key
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(public={})", self.public_key())
    }
}

/// Public verification key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LENGTH]);

impl PublicKey {
    pub fn from_hex(value: &str) -> Result<Self> {
        let bytes = hex::decode(value.trim())
            .map_err(|e| Error::InvalidKey(format!("public key is not hex: {}", e)))?;
        let array: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::InvalidKey(format!(
                "public key must be {} bytes, got {}",
                PUBLIC_KEY_LENGTH,
                b.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Check a hex-encoded signature over `message`
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        let Ok(bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature) = EdSignature::from_slice(&bytes) else {
            return false;
        };
        key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Derive the hex public key for a hex private key
pub fn derive_public_key(private_key_hex: &str) -> Result<String> {
    Ok(PrivateKey::from_hex(private_key_hex)?.public_key().to_hex())
}
