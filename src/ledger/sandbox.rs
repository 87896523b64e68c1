//! In-process transport backed by the sandbox ledger

use super::engine::Ledger;
use crate::error::Result;
use crate::queries::{BlocksQuery, Query, QueryResponse};
use crate::status::StatusStream;
use crate::transport::{BlockStream, Transport};
use crate::types::{ToriiResponse, Transaction, TxHash};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// `Transport` over a shared [`Ledger`]
///
/// Behaves like the network transport: stateless rejections are reported
/// through transaction statuses, not as call errors.
#[derive(Clone)]
pub struct SandboxTransport {
    ledger: Arc<Ledger>,
}

impl SandboxTransport {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }
}

#[async_trait]
impl Transport for SandboxTransport {
    async fn submit(&self, tx: Transaction) -> Result<()> {
        self.submit_batch(vec![tx]).await
    }

    async fn submit_batch(&self, txs: Vec<Transaction>) -> Result<()> {
        if let Err(e) = self.ledger.submit(txs).await {
            warn!("Submission rejected by stateless validation: {}", e);
        }
        Ok(())
    }

    async fn query(&self, query: Query) -> Result<QueryResponse> {
        Ok(self.ledger.find(&query).await)
    }

    async fn status(&self, hash: &TxHash) -> Result<ToriiResponse> {
        Ok(self.ledger.status(hash).await)
    }

    async fn stream_status(&self, hash: &TxHash) -> Result<StatusStream> {
        Ok(self.ledger.subscribe(*hash).await)
    }

    async fn stream_blocks(&self, query: BlocksQuery) -> Result<BlockStream> {
        self.ledger.stream_blocks(&query).await
    }
}
