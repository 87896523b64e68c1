//! Multi-Signature Pool Module
//!
//! Holds batches whose members do not yet carry enough signatures. New
//! submissions of the same batch are merged into the stored copy (signatures
//! are unioned by public key) until every member reaches its quorum.

use crate::batch::{batch_id, TxBatch};
use crate::crypto::{self, Signable};
use crate::types::{Transaction, TxHash};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Result of offering a batch to the pool
#[derive(Debug, Clone, PartialEq)]
pub enum MstState {
    /// Still missing signatures; the merged batch stays in the pool
    Pending(TxBatch),
    /// Every member reached its quorum; the batch left the pool
    Completed(TxBatch),
}

#[derive(Debug, Clone)]
struct PendingEntry {
    batch: TxBatch,
    received_at: u64,
}

/// Pool of incomplete multi-signature batches, keyed by batch identity
pub struct MstPool {
    batches: RwLock<HashMap<TxHash, PendingEntry>>,
}

impl MstPool {
    pub fn new() -> Self {
        Self {
            batches: RwLock::new(HashMap::new()),
        }
    }

    /// Merge a submitted batch into the pool
    ///
    /// # Arguments
    /// * `transactions` - All members of one batch, already statelessly valid
    /// * `now` - Current time in milliseconds, recorded for expiry
    ///
    /// # Returns
    /// `Completed` when the merged batch satisfies every member's quorum,
    /// `Pending` otherwise
    pub async fn offer(&self, transactions: Vec<Transaction>, now: u64) -> MstState {
        let id = transactions.first().map(batch_id).unwrap_or_default();
        let mut batches = self.batches.write().await;

        // Step 1: Merge with the stored copy, if any
        let merged = match batches.remove(&id) {
            Some(mut entry) => {
                for incoming in &transactions {
                    let hash = incoming.hash();
                    match entry
                        .batch
                        .transactions
                        .iter_mut()
                        .find(|stored| stored.hash() == hash)
                    {
                        Some(stored) => merge_signatures(stored, incoming),
                        None => warn!("Transaction {} is not a member of batch {}", hash, id),
                    }
                }
                debug!("Merged signatures into pending batch {}", id);
                entry
            }
            None => {
                let members = transactions
                    .iter()
                    .map(|tx| {
                        let mut unique = Transaction {
                            payload: tx.payload.clone(),
                            signatures: Vec::new(),
                        };
                        merge_signatures(&mut unique, tx);
                        unique
                    })
                    .collect();
                PendingEntry {
                    batch: TxBatch::new(members),
                    received_at: now,
                }
            }
        };

        // Step 2: Forward complete batches, keep the rest
        if merged.batch.is_complete() {
            info!("Batch {} collected enough signatures", id);
            MstState::Completed(merged.batch)
        } else {
            let snapshot = merged.batch.clone();
            batches.insert(id, merged);
            MstState::Pending(snapshot)
        }
    }

    /// Pending batches containing a transaction created by `account_id`
    pub async fn pending_for(&self, account_id: &str) -> Vec<TxBatch> {
        let batches = self.batches.read().await;
        let mut entries: Vec<&PendingEntry> = batches
            .values()
            .filter(|entry| {
                entry
                    .batch
                    .transactions
                    .iter()
                    .any(|tx| tx.creator_account_id() == account_id)
            })
            .collect();
        entries.sort_by_key(|entry| entry.received_at);
        entries.into_iter().map(|entry| entry.batch.clone()).collect()
    }

    /// Remove and return batches received more than `expiration_ms` ago
    pub async fn expire(&self, now: u64, expiration_ms: u64) -> Vec<TxBatch> {
        let mut batches = self.batches.write().await;
        let expired: Vec<TxHash> = batches
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.received_at) >= expiration_ms)
            .map(|(id, _)| *id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| batches.remove(&id))
            .map(|entry| {
                info!("Pending batch {} expired", entry.batch.id());
                entry.batch
            })
            .collect()
    }

    pub async fn contains(&self, hash: &TxHash) -> bool {
        let batches = self.batches.read().await;
        batches
            .values()
            .any(|entry| entry.batch.transactions.iter().any(|tx| tx.hash() == *hash))
    }

    pub async fn len(&self) -> usize {
        self.batches.read().await.len()
    }
}

impl Default for MstPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Add the signatures of `incoming` whose public key `stored` does not have
/// yet and that verify against the stored payload
fn merge_signatures(stored: &mut Transaction, incoming: &Transaction) {
    for signature in &incoming.signatures {
        let known = stored
            .signatures
            .iter()
            .any(|s| s.public_key.eq_ignore_ascii_case(&signature.public_key));
        if known {
            continue;
        }
        if !crypto::verify(Signable::Transaction(stored), signature) {
            warn!(
                "Dropping signature of {} that does not match transaction {}",
                signature.public_key,
                stored.hash()
            );
            continue;
        }
        stored.signatures.push(signature.clone());
    }
}
