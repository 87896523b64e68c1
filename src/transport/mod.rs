//! Transport Module
//!
//! The capability boundary to the ledger engine. Everything the client does
//! remotely goes through [`Transport`]:
//! - GrpcTransport: tonic client for a running engine
//! - SandboxTransport (in `ledger`): in-process engine for tests and demos

mod grpc;

pub use grpc::GrpcTransport;

use crate::error::Result;
use crate::queries::{BlocksQuery, Query, QueryResponse};
use crate::status::StatusStream;
use crate::types::{Block, ToriiResponse, Transaction, TxHash};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

/// Committed blocks, in height order
pub type BlockStream = Pin<Box<dyn Stream<Item = Result<Block>> + Send>>;

/// Engine operations used by the client
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit one transaction
    async fn submit(&self, tx: Transaction) -> Result<()>;

    /// Submit a list of transactions in one call (batches travel this way)
    async fn submit_batch(&self, txs: Vec<Transaction>) -> Result<()>;

    async fn query(&self, query: Query) -> Result<QueryResponse>;

    /// Latest known status of a transaction
    async fn status(&self, hash: &TxHash) -> Result<ToriiResponse>;

    /// Subscribe to status updates of a transaction
    async fn stream_status(&self, hash: &TxHash) -> Result<StatusStream>;

    /// Subscribe to committed blocks
    async fn stream_blocks(&self, query: BlocksQuery) -> Result<BlockStream>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn submit(&self, tx: Transaction) -> Result<()> {
        (**self).submit(tx).await
    }

    async fn submit_batch(&self, txs: Vec<Transaction>) -> Result<()> {
        (**self).submit_batch(txs).await
    }

    async fn query(&self, query: Query) -> Result<QueryResponse> {
        (**self).query(query).await
    }

    async fn status(&self, hash: &TxHash) -> Result<ToriiResponse> {
        (**self).status(hash).await
    }

    async fn stream_status(&self, hash: &TxHash) -> Result<StatusStream> {
        (**self).stream_status(hash).await
    }

    async fn stream_blocks(&self, query: BlocksQuery) -> Result<BlockStream> {
        (**self).stream_blocks(query).await
    }
}
