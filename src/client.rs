//! Client Session Module
//!
//! One `Client` per party: the account it acts for, its signing keys, and a
//! query counter. Parties in the same process each own their own client and
//! share nothing but the engine behind the transport.

use crate::builder::{QueryBuilder, TransactionBuilder};
use crate::commands::Command;
use crate::crypto::PrivateKey;
use crate::error::{Error, Result};
use crate::queries::{QueryKind, QueryResponse};
use crate::signing;
use crate::status::{track, BatchOutcome};
use crate::transport::{BlockStream, Transport};
use crate::types::{ToriiResponse, Transaction, TxHash};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

pub struct Client<T: Transport> {
    transport: T,
    account_id: String,
    keys: Vec<PrivateKey>,
    query_counter: AtomicU64,
}

impl<T: Transport> Client<T> {
    /// # Arguments
    /// * `transport` - Connection to the engine
    /// * `account_id` - Account this party acts for, `name@domain`
    /// * `keys` - Signing keys of the account; the first one signs queries
    pub fn new(transport: T, account_id: impl Into<String>, keys: Vec<PrivateKey>) -> Self {
        Self {
            transport,
            account_id: account_id.into(),
            keys,
            query_counter: AtomicU64::new(1),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn keys(&self) -> &[PrivateKey] {
        &self.keys
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a transaction created by this party
    pub fn transaction(&self, commands: Vec<Command>) -> TransactionBuilder {
        TransactionBuilder::new(self.account_id.clone()).commands(commands)
    }

    /// Append a signature from every key of this party
    pub fn sign<'a>(&self, tx: &'a mut Transaction) -> &'a mut Transaction {
        signing::sign_with_all(tx, &self.keys)
    }

    pub async fn send(&self, tx: Transaction) -> Result<TxHash> {
        let hash = tx.hash();
        self.transport.submit(tx).await?;
        debug!("{} sent transaction {}", self.account_id, hash);
        Ok(hash)
    }

    pub async fn send_batch(&self, txs: Vec<Transaction>) -> Result<Vec<TxHash>> {
        let hashes: Vec<TxHash> = txs.iter().map(Transaction::hash).collect();
        self.transport.submit_batch(txs).await?;
        debug!("{} sent {} transactions", self.account_id, hashes.len());
        Ok(hashes)
    }

    /// Submit a transaction and wait for its terminal status
    ///
    /// # Returns
    /// * `Ok(ToriiResponse)` when the transaction committed
    /// * `Err(Error::Rejected)` for any other terminal status
    pub async fn send_and_wait(&self, tx: Transaction) -> Result<ToriiResponse> {
        let hash = self.send(tx).await?;
        let response = self.transport.stream_status(&hash).await?.wait_terminal().await?;
        if response.status().is_committed() {
            Ok(response)
        } else {
            Err(Error::Rejected {
                hash,
                status: response.status(),
                reason: response.error_message,
            })
        }
    }

    /// Submit a list of transactions in one call and follow every member
    pub async fn send_batch_and_wait(&self, txs: Vec<Transaction>) -> Result<BatchOutcome> {
        let hashes = self.send_batch(txs).await?;
        let outcome = track(&self.transport, &hashes).await?.outcome();
        info!("{} batch outcome: {:?}", self.account_id, outcome);
        Ok(outcome)
    }

    /// Sign and run a query
    ///
    /// An `ErrorResponse` from the engine is returned as `Error::QueryRejected`.
    pub async fn query(&self, kind: QueryKind) -> Result<QueryResponse> {
        let key = self.query_key()?;
        let name = kind.name();

        let mut query = QueryBuilder::new(self.account_id.clone())
            .counter(self.next_counter())
            .build(kind)?;
        signing::sign_query(&mut query, key);

        let response = self.transport.query(query).await?;
        if let Some(error) = response.as_error() {
            return Err(Error::QueryRejected(format!(
                "{} failed: {:?} {}",
                name,
                error.reason(),
                error.message
            )));
        }
        Ok(response)
    }

    /// Pending transactions of every batch this party takes part in as a creator
    pub async fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        self.query(QueryKind::get_pending_transactions())
            .await?
            .into_transactions()
            .ok_or_else(|| Error::UnexpectedResponse("expected TransactionsResponse".to_string()))
    }

    /// Subscribe to committed blocks
    pub async fn blocks(&self) -> Result<BlockStream> {
        let key = self.query_key()?;
        let mut query = QueryBuilder::new(self.account_id.clone())
            .counter(self.next_counter())
            .build_blocks()?;
        signing::sign_blocks_query(&mut query, key);
        self.transport.stream_blocks(query).await
    }

    fn query_key(&self) -> Result<&PrivateKey> {
        self.keys
            .first()
            .ok_or_else(|| Error::InvalidKey(format!("{} has no signing key", self.account_id)))
    }

    fn next_counter(&self) -> u64 {
        self.query_counter.fetch_add(1, Ordering::SeqCst)
    }
}
