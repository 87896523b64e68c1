//! Grouping of flat transaction lists into batches

use super::composer::batch_id;
use crate::types::{BatchMeta, Transaction, TxHash};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Transactions sharing one batch meta (or a lone transaction without meta)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxBatch {
    pub transactions: Vec<Transaction>,
    pub meta: Option<BatchMeta>,
}

impl TxBatch {
    pub fn new(transactions: Vec<Transaction>) -> Self {
        let meta = transactions.first().and_then(|tx| tx.batch_meta().cloned());
        Self { transactions, meta }
    }

    /// Batch identity shared by every member
    pub fn id(&self) -> TxHash {
        self.transactions
            .first()
            .map(batch_id)
            .unwrap_or_default()
    }

    pub fn hashes(&self) -> Vec<TxHash> {
        self.transactions.iter().map(|tx| tx.hash()).collect()
    }

    pub fn is_atomic(&self) -> bool {
        self.meta.as_ref().map(|m| m.is_atomic()).unwrap_or(false)
    }

    /// Every member carries at least `quorum` signatures
    pub fn is_complete(&self) -> bool {
        !self.transactions.is_empty()
            && self
                .transactions
                .iter()
                .all(|tx| tx.signatures.len() >= tx.quorum() as usize)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }
}

/// Splitter for transaction lists returned by the engine
pub struct BatchSequence;

impl BatchSequence {
    /// Group transactions by batch identity, keeping first-seen order
    ///
    /// Members of one batch need not be adjacent in the input. A transaction
    /// without batch meta forms its own batch.
    pub fn split(transactions: Vec<Transaction>) -> Vec<TxBatch> {
        let mut groups: Vec<Vec<Transaction>> = Vec::new();
        let mut index: HashMap<TxHash, usize> = HashMap::new();

        for tx in transactions {
            let id = batch_id(&tx);
            match index.get(&id) {
                Some(&position) => groups[position].push(tx),
                None => {
                    index.insert(id, groups.len());
                    groups.push(vec![tx]);
                }
            }
        }

        groups.into_iter().map(TxBatch::new).collect()
    }
}
