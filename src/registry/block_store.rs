//! Block Registry Module
//!
//! Append-only chain of committed blocks with lookup indexes:
//! - transaction hash -> (height, position)
//! - creator account -> committed transaction hashes
//!
//! Newly appended blocks are broadcast to block subscribers.

use crate::types::{Block, BlockPayload, BlockV1, Transaction, TxHash};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::info;

const BLOCK_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct Chain {
    blocks: Vec<Block>,
    tx_index: HashMap<TxHash, (u64, usize)>,
    account_index: HashMap<String, Vec<TxHash>>,
}

/// Block store for the sandbox engine
pub struct BlockStore {
    chain: RwLock<Chain>,
    sender: broadcast::Sender<Block>,
}

impl BlockStore {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BLOCK_CHANNEL_CAPACITY);
        Self {
            chain: RwLock::new(Chain::default()),
            sender,
        }
    }

    /// Build and append the next block
    ///
    /// # Arguments
    /// * `transactions` - Committed transactions, in commit order
    /// * `rejected` - Hashes of transactions rejected while building this block
    /// * `created_time` - Block time in milliseconds
    ///
    /// # Returns
    /// The appended block
    pub async fn append(
        &self,
        transactions: Vec<Transaction>,
        rejected: Vec<TxHash>,
        created_time: u64,
    ) -> Block {
        let mut chain = self.chain.write().await;

        let height = chain.blocks.len() as u64 + 1;
        let prev_block_hash = chain
            .blocks
            .last()
            .map(|b| b.hash().to_hex())
            .unwrap_or_else(|| TxHash::default().to_hex());

        // Step 1: Index committed transactions
        for (position, tx) in transactions.iter().enumerate() {
            let hash = tx.hash();
            chain.tx_index.insert(hash, (height, position));
            chain
                .account_index
                .entry(tx.creator_account_id().to_string())
                .or_default()
                .push(hash);
        }

        // Step 2: Seal the block
        let block = Block {
            block_v1: Some(BlockV1 {
                payload: Some(BlockPayload {
                    tx_number: transactions.len() as u32,
                    transactions,
                    height,
                    prev_block_hash,
                    created_time,
                    rejected_transactions_hashes: rejected.iter().map(|h| h.to_hex()).collect(),
                }),
                signatures: Vec::new(),
            }),
        };
        chain.blocks.push(block.clone());
        drop(chain);

        info!(
            "Block #{} appended with {} transactions, {} rejected",
            height,
            block.payload().map(|p| p.tx_number).unwrap_or_default(),
            rejected.len()
        );

        // No subscribers is fine
        let _ = self.sender.send(block.clone());
        block
    }

    pub async fn height(&self) -> u64 {
        self.chain.read().await.blocks.len() as u64
    }

    pub async fn block(&self, height: u64) -> Option<Block> {
        let chain = self.chain.read().await;
        let index = usize::try_from(height.checked_sub(1)?).ok()?;
        chain.blocks.get(index).cloned()
    }

    /// Committed transaction by hash
    pub async fn transaction(&self, hash: &TxHash) -> Option<Transaction> {
        let chain = self.chain.read().await;
        let (height, position) = *chain.tx_index.get(hash)?;
        chain
            .blocks
            .get(height as usize - 1)?
            .payload()?
            .transactions
            .get(position)
            .cloned()
    }

    pub async fn contains(&self, hash: &TxHash) -> bool {
        self.chain.read().await.tx_index.contains_key(hash)
    }

    /// Committed transactions created by `account_id`, in commit order
    pub async fn account_transactions(&self, account_id: &str) -> Vec<Transaction> {
        let hashes = {
            let chain = self.chain.read().await;
            chain.account_index.get(account_id).cloned().unwrap_or_default()
        };
        let mut transactions = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(tx) = self.transaction(&hash).await {
                transactions.push(tx);
            }
        }
        transactions
    }

    /// Subscribe to blocks appended from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Block> {
        self.sender.subscribe()
    }
}

impl Default for BlockStore {
    fn default() -> Self {
        Self::new()
    }
}
