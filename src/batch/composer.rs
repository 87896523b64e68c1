//! Batch meta composition
//!
//! Tying computes the reduced hash of every member, builds one meta listing
//! them in member order and stamps a copy of it on each member. Tying must
//! happen before signing: the meta is part of the signed payload.

use crate::crypto;
use crate::error::ValidationError;
use crate::types::{BatchMeta, BatchType, Transaction, TxHash};
use std::collections::HashSet;
use tracing::info;

/// Tie transactions into a batch
///
/// # Arguments
/// * `transactions` - Members in batch order; modified in place
/// * `batch_type` - `Atomic` or `Ordered`
///
/// # Returns
/// * `Ok(BatchMeta)` - the meta now carried by every member
/// * `Err(ValidationError)` - empty input, duplicate members, or a member
///   that already carries signatures
pub fn tie(
    transactions: &mut [Transaction],
    batch_type: BatchType,
) -> Result<BatchMeta, ValidationError> {
    if transactions.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }

    // Step 1: Refuse signed members, their signatures would go stale
    if let Some(signed) = transactions.iter().find(|tx| tx.is_signed()) {
        return Err(ValidationError::AlreadySigned(signed.hash().to_hex()));
    }

    // Step 2: Reduced hashes in member order
    let reduced_hashes: Vec<String> = transactions
        .iter()
        .map(|tx| tx.reduced_hash().to_hex())
        .collect();
    let mut seen = HashSet::new();
    for hash in &reduced_hashes {
        if !seen.insert(hash.as_str()) {
            return Err(ValidationError::DuplicateReducedHash(hash.clone()));
        }
    }

    // Step 3: Same meta on every member
    let meta = BatchMeta::new(batch_type, reduced_hashes);
    for tx in transactions.iter_mut() {
        tx.set_batch_meta(meta.clone());
    }

    info!(
        "Tied {} transactions into {:?} batch {}",
        transactions.len(),
        batch_type,
        batch_hash(&meta)?
    );
    Ok(meta)
}

const LONE_TAG: u8 = 0;

fn batch_tag(batch_type: BatchType) -> u8 {
    match batch_type {
        BatchType::Atomic => 1,
        BatchType::Ordered => 2,
    }
}

/// Identity of a batch: SHA3-256 over the batch type tag followed by the
/// concatenated reduced hashes
///
/// # Returns
/// * `Ok(TxHash)` - the batch identity
/// * `Err(ValidationError::MalformedReducedHash)` - a listed reduced hash is
///   not 32-byte hex
pub fn batch_hash(meta: &BatchMeta) -> Result<TxHash, ValidationError> {
    let mut bytes = vec![batch_tag(meta.batch_type())];
    for reduced in &meta.reduced_hashes {
        let decoded = TxHash::from_hex(reduced)
            .ok_or_else(|| ValidationError::MalformedReducedHash(reduced.clone()))?;
        bytes.extend_from_slice(&decoded.0);
    }
    Ok(crypto::sha3_256(&bytes))
}

/// Batch identity of a transaction
///
/// A transaction without meta is a batch of one, kept apart from a tied
/// batch of one with the same reduced payload. A transaction whose meta does
/// not parse is identified by its own hash.
pub fn batch_id(tx: &Transaction) -> TxHash {
    match tx.batch_meta().map(batch_hash) {
        Some(Ok(id)) => id,
        Some(Err(_)) => tx.hash(),
        None => {
            let mut bytes = vec![LONE_TAG];
            bytes.extend_from_slice(&tx.reduced_hash().0);
            crypto::sha3_256(&bytes)
        }
    }
}
