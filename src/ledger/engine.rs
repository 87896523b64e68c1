//! Sandbox Ledger Module
//!
//! Single-process stand-in for the ledger engine. A submission flows through:
//! 1. Stateless validation of every batch in the submission
//! 2. The MST pool, which merges signatures until every member reaches quorum
//! 3. Stateful validation of the completed batch on a scratch world state
//! 4. Block commit and status publication
//!
//! A background expiry loop drops pending batches that wait too long.

use super::query::QueryExecutor;
use super::status_bus::StatusBus;
use crate::batch::{BatchSequence, TxBatch};
use crate::commands::RolePermission;
use crate::config::{Config, MstConfig, ValidationConfig};
use crate::crypto::{self, Signable};
use crate::error::{Error, Result, ValidationError};
use crate::pool::{MstPool, MstState};
use crate::queries::{BlocksQuery, ErrorReason, Query, QueryResponse};
use crate::registry::BlockStore;
use crate::state::{apply_genesis, apply_transaction, StatefulError, WorldState};
use crate::status::StatusStream;
use crate::transport::BlockStream;
use crate::types::{now_millis, Block, Signature, ToriiResponse, Transaction, TxHash, TxStatus};
use crate::validation::Validator;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info, info_span, warn, Instrument};

/// Why a member of a completed batch was not committed
struct Failure {
    hash: TxHash,
    message: String,
    failed_cmd_index: u32,
    error_code: u32,
}

impl Failure {
    fn from_error(hash: TxHash, error: &StatefulError) -> Self {
        Self {
            hash,
            message: error.to_string(),
            failed_cmd_index: error.failed_cmd_index(),
            error_code: error.error_code(),
        }
    }

    fn response(&self, status: TxStatus) -> ToriiResponse {
        let mut response = ToriiResponse::new(&self.hash, status).with_error(self.message.clone());
        response.failed_cmd_index = self.failed_cmd_index;
        response.error_code = self.error_code;
        response
    }
}

/// In-process ledger engine
pub struct Ledger {
    validator: Validator,
    mst: MstConfig,
    world: RwLock<WorldState>,
    pool: MstPool,
    blocks: BlockStore,
    statuses: StatusBus,
}

impl Ledger {
    pub fn new(validation: ValidationConfig, mst: MstConfig) -> Self {
        Self {
            validator: Validator::new(validation),
            mst,
            world: RwLock::new(WorldState::new()),
            pool: MstPool::new(),
            blocks: BlockStore::new(),
            statuses: StatusBus::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.validation.clone(), config.mst.clone())
    }

    /// Apply the genesis transaction and write it as the first block
    ///
    /// No signatures or permissions are checked.
    pub async fn apply_genesis(&self, tx: Transaction) -> std::result::Result<Block, StatefulError> {
        let mut world = self.world.write().await;
        apply_genesis(&mut world, &tx)?;

        let hash = tx.hash();
        let block = self.blocks.append(vec![tx], Vec::new(), now_millis()).await;
        drop(world);

        self.statuses
            .publish(ToriiResponse::new(&hash, TxStatus::Committed))
            .await;
        info!("Genesis committed at height {}", block.height());
        Ok(block)
    }

    /// Accept a list of transactions
    ///
    /// The list may hold several batches and single transactions. When any
    /// batch fails stateless validation, nothing reaches the pool and every
    /// transaction of the list not seen before is marked
    /// `STATELESS_VALIDATION_FAILED`.
    ///
    /// # Returns
    /// Hashes of the submitted transactions, in submission order
    pub async fn submit(
        &self,
        transactions: Vec<Transaction>,
    ) -> std::result::Result<Vec<TxHash>, ValidationError> {
        let hashes: Vec<TxHash> = transactions.iter().map(Transaction::hash).collect();
        let span = info_span!("submit", txs = hashes.len());
        self.submit_inner(transactions, &hashes)
            .instrument(span)
            .await?;
        Ok(hashes)
    }

    async fn submit_inner(
        &self,
        transactions: Vec<Transaction>,
        hashes: &[TxHash],
    ) -> std::result::Result<(), ValidationError> {
        let now = now_millis();
        let batches = BatchSequence::split(transactions);

        // Step 1: Stateless validation of the whole list
        if let Some(error) = batches
            .iter()
            .find_map(|batch| self.validator.validate_batch(&batch.transactions, now).err())
        {
            warn!("Stateless validation failed: {}", error);
            // Transactions the engine already tracks keep their status
            for hash in hashes {
                if self.statuses.get(hash).await.status() != TxStatus::NotReceived {
                    debug!("Keeping status of known transaction {}", hash);
                    continue;
                }
                let response = ToriiResponse::new(hash, TxStatus::StatelessValidationFailed)
                    .with_error(error.to_string());
                self.statuses.publish(response).await;
            }
            return Err(error);
        }

        // Step 2: Pool each batch, commit the completed ones
        for batch in batches {
            if self.is_finished(&batch).await {
                warn!("Batch {} was already processed, ignoring replay", batch.id());
                continue;
            }
            self.publish_all(&batch.hashes(), TxStatus::StatelessValidationSuccess)
                .await;

            match self.pool.offer(batch.transactions, now).await {
                MstState::Pending(pending) => {
                    debug!("Batch {} waits for signatures", pending.id());
                    self.publish_all(&pending.hashes(), TxStatus::MstPending)
                        .await;
                }
                MstState::Completed(complete) => {
                    self.publish_all(&complete.hashes(), TxStatus::EnoughSignaturesCollected)
                        .await;
                    self.commit(complete, now).await;
                }
            }
        }
        Ok(())
    }

    async fn is_finished(&self, batch: &TxBatch) -> bool {
        for hash in batch.hashes() {
            if self.statuses.get(&hash).await.status().is_terminal() {
                return true;
            }
        }
        false
    }

    async fn publish_all(&self, hashes: &[TxHash], status: TxStatus) {
        for hash in hashes {
            self.statuses.publish(ToriiResponse::new(hash, status)).await;
        }
    }

    /// Stateful validation and commit of a batch with enough signatures
    ///
    /// Atomic batches are applied member after member on one scratch state
    /// and the first failure rejects every member. Ordered batches apply each
    /// member on its own and keep the ones that succeed. A block is appended
    /// only when something commits.
    async fn commit(&self, batch: TxBatch, now: u64) {
        let atomic = batch.is_atomic();
        let batch_id = batch.id();

        let mut world = self.world.write().await;
        let mut scratch = world.clone();
        let mut committed = Vec::new();
        let mut failures = Vec::new();

        if atomic {
            let failure = batch.transactions.iter().enumerate().find_map(|(index, tx)| {
                apply_transaction(&mut scratch, tx)
                    .err()
                    .map(|error| (index, Failure::from_error(tx.hash(), &error)))
            });
            match failure {
                None => committed = batch.transactions,
                Some((index, cause)) => {
                    for (position, tx) in batch.transactions.iter().enumerate() {
                        if position == index {
                            continue;
                        }
                        failures.push(Failure {
                            hash: tx.hash(),
                            message: format!(
                                "Atomic batch member #{} failed: {}",
                                index, cause.message
                            ),
                            failed_cmd_index: 0,
                            error_code: cause.error_code,
                        });
                    }
                    failures.insert(index, cause);
                }
            }
        } else {
            for tx in batch.transactions {
                match apply_transaction(&mut scratch, &tx) {
                    Ok(()) => committed.push(tx),
                    Err(error) => failures.push(Failure::from_error(tx.hash(), &error)),
                }
            }
        }

        let committed_hashes: Vec<TxHash> = committed.iter().map(Transaction::hash).collect();
        let rejected_hashes: Vec<TxHash> = failures.iter().map(|f| f.hash).collect();
        info!(
            "Batch {} ({}): {} committed, {} rejected",
            batch_id,
            if atomic { "atomic" } else { "ordered" },
            committed_hashes.len(),
            rejected_hashes.len()
        );

        if !committed.is_empty() {
            *world = scratch;
            self.blocks.append(committed, rejected_hashes, now).await;
        }
        drop(world);

        for hash in &committed_hashes {
            self.statuses
                .publish(ToriiResponse::new(hash, TxStatus::StatefulValidationSuccess))
                .await;
            self.statuses
                .publish(ToriiResponse::new(hash, TxStatus::Committed))
                .await;
        }
        for failure in &failures {
            self.statuses
                .publish(failure.response(TxStatus::StatefulValidationFailed))
                .await;
            self.statuses
                .publish(failure.response(TxStatus::Rejected))
                .await;
        }
    }

    /// Answer a signed query
    ///
    /// Stateless checks come first, then the signing key must belong to the
    /// creator account.
    pub async fn find(&self, query: &Query) -> QueryResponse {
        let query_hash = crypto::hash(Signable::Query(query)).to_hex();
        if let Err(error) = self.validator.validate_query(query, now_millis()) {
            return QueryResponse::error(query_hash, ErrorReason::StatelessInvalid, error.to_string());
        }

        let world = self.world.read().await;
        let creator = query.creator_account_id();
        if let Err(message) = check_query_signatory(&world, creator, query.signature.as_ref()) {
            return QueryResponse::error(query_hash, ErrorReason::StatefulInvalid, message);
        }
        let Some(kind) = query.kind() else {
            return QueryResponse::error(query_hash, ErrorReason::NotSupported, "Empty query");
        };

        QueryExecutor {
            world: &world,
            blocks: &self.blocks,
            pool: &self.pool,
            creator,
            query_hash,
        }
        .execute(kind)
        .await
    }

    /// Subscribe to blocks committed from now on
    pub async fn stream_blocks(&self, query: &BlocksQuery) -> Result<BlockStream> {
        self.validator.validate_blocks_query(query, now_millis())?;
        {
            let world = self.world.read().await;
            let creator = query.creator_account_id();
            check_query_signatory(&world, creator, query.signature.as_ref())
                .map_err(Error::QueryRejected)?;
            if !world.has_permission(creator, RolePermission::CanGetBlocks) {
                return Err(Error::QueryRejected(format!(
                    "{} has no permission to read blocks",
                    creator
                )));
            }
        }

        let blocks = BroadcastStream::new(self.blocks.subscribe()).filter_map(|item| {
            let block: Option<Result<Block>> = match item {
                Ok(block) => Some(Ok(block)),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Block subscriber lagged by {} blocks", skipped);
                    None
                }
            };
            futures::future::ready(block)
        });
        Ok(Box::pin(blocks))
    }

    pub async fn status(&self, hash: &TxHash) -> ToriiResponse {
        self.statuses.get(hash).await
    }

    pub async fn subscribe(&self, hash: TxHash) -> StatusStream {
        self.statuses.subscribe(hash).await
    }

    /// Drop pending batches older than the MST expiration time
    ///
    /// # Returns
    /// Number of expired batches
    pub async fn expire(&self, now: u64) -> usize {
        let expired = self.pool.expire(now, self.mst.expiration_ms).await;
        for batch in &expired {
            for hash in batch.hashes() {
                let response = ToriiResponse::new(&hash, TxStatus::MstExpired)
                    .with_error("Pending batch expired before collecting enough signatures");
                self.statuses.publish(response).await;
            }
        }
        expired.len()
    }

    /// Start the background MST expiry loop
    pub fn spawn_expiry(self: Arc<Self>) -> JoinHandle<()> {
        let period = Duration::from_millis(self.mst.sweep_interval_ms.max(1));
        info!(
            "MST expiry loop starting: expiration_ms={}, sweep_interval_ms={}",
            self.mst.expiration_ms, self.mst.sweep_interval_ms
        );
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let expired = self.expire(now_millis()).await;
                if expired > 0 {
                    info!("Expired {} pending batches", expired);
                }
            }
        })
    }

    /// Snapshot of the world state
    pub async fn world(&self) -> WorldState {
        self.world.read().await.clone()
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn pool(&self) -> &MstPool {
        &self.pool
    }
}

/// The query signer must be a signatory of the query creator
fn check_query_signatory(
    world: &WorldState,
    creator: &str,
    signature: Option<&Signature>,
) -> std::result::Result<(), String> {
    let account = world
        .account(creator)
        .ok_or_else(|| format!("Query creator {} does not exist", creator))?;
    let signature = signature.ok_or_else(|| "Query is not signed".to_string())?;
    if !account.has_signatory(&signature.public_key) {
        return Err(format!(
            "Key {} is not a signatory of {}",
            signature.public_key, creator
        ));
    }
    Ok(())
}
