//! Payload hashing and signing
//!
//! Every signable message is hashed over the prost encoding of its payload
//! with SHA3-256; signatures cover that 32-byte digest.

use super::keys::{PrivateKey, PublicKey};
use crate::queries::{BlocksQuery, Query};
use crate::types::{Block, Signature, Transaction, TxHash};
use prost::Message;
use sha3::{Digest, Sha3_256};

/// Anything that carries a signed payload
///
/// The variant decides which part of the message is hashed: the transaction
/// payload, the query payload, the blocks-query meta, or the block payload.
#[derive(Debug, Clone, Copy)]
pub enum Signable<'a> {
    Transaction(&'a Transaction),
    Query(&'a Query),
    BlocksQuery(&'a BlocksQuery),
    Block(&'a Block),
}

impl Signable<'_> {
    /// Canonical bytes of the signed part of the message
    pub fn payload_bytes(&self) -> Vec<u8> {
        match self {
            Signable::Transaction(tx) => encode_optional(tx.payload.as_ref()),
            Signable::Query(query) => encode_optional(query.payload.as_ref()),
            Signable::BlocksQuery(query) => encode_optional(query.meta.as_ref()),
            Signable::Block(block) => encode_optional(block.payload()),
        }
    }
}

fn encode_optional<M: Message>(message: Option<&M>) -> Vec<u8> {
    message.map(|m| m.encode_to_vec()).unwrap_or_default()
}

pub fn sha3_256(bytes: &[u8]) -> TxHash {
    TxHash(Sha3_256::digest(bytes).into())
}

pub fn hash(target: Signable<'_>) -> TxHash {
    sha3_256(&target.payload_bytes())
}

/// Hash of the reduced payload (creator, commands, quorum, created time)
pub fn reduced_hash(tx: &Transaction) -> TxHash {
    sha3_256(&tx.reduced_payload().encode_to_vec())
}

/// Sign the current payload hash of `target`
pub fn sign(target: Signable<'_>, key: &PrivateKey) -> Signature {
    let digest = hash(target);
    Signature {
        public_key: key.public_key().to_hex(),
        signature: hex::encode(key.sign(&digest.0)),
    }
}

/// Check one signature against the current payload hash of `target`
pub fn verify(target: Signable<'_>, signature: &Signature) -> bool {
    let Ok(public_key) = PublicKey::from_hex(&signature.public_key) else {
        return false;
    };
    public_key.verify(&hash(target).0, &signature.signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::types::{BatchMeta, BatchType, ReducedPayload};

    fn sample_tx() -> Transaction {
        Transaction::from_reduced(ReducedPayload {
            commands: vec![Command::set_account_quorum("alice@test", 2)],
            creator_account_id: "alice@test".to_string(),
            created_time: 1_700_000_000_000,
            quorum: 1,
        })
    }

    #[test]
    fn test_reduced_hash_ignores_batch_meta_and_signatures() {
        let mut tx = sample_tx();
        let before = reduced_hash(&tx);
        let full_before = hash(Signable::Transaction(&tx));

        tx.set_batch_meta(BatchMeta::new(BatchType::Atomic, vec![before.to_hex()]));
        let key = PrivateKey::generate();
        let signature = sign(Signable::Transaction(&tx), &key);
        tx.signatures.push(signature);

        assert_eq!(reduced_hash(&tx), before);
        // Full hash covers batch meta but not signatures
        assert_ne!(hash(Signable::Transaction(&tx)), full_before);
    }

    #[test]
    fn test_signature_covers_batch_meta() {
        let mut tx = sample_tx();
        let key = PrivateKey::generate();
        let signature = sign(Signable::Transaction(&tx), &key);
        assert!(verify(Signable::Transaction(&tx), &signature));

        tx.set_batch_meta(BatchMeta::new(BatchType::Ordered, vec!["00".to_string()]));
        assert!(!verify(Signable::Transaction(&tx), &signature));
    }

    #[test]
    fn test_malformed_signature_does_not_verify() {
        let tx = sample_tx();
        let bad = Signature {
            public_key: "zz".to_string(),
            signature: "00".to_string(),
        };
        assert!(!verify(Signable::Transaction(&tx), &bad));
    }
}
