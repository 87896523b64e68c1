//! gRPC transport
//!
//! Hand-written tonic client for the engine's `CommandService_v1` and
//! `QueryService_v1`. Messages are the prost mirrors from `types` and
//! `queries`; `google.protobuf.Empty` maps to `()`.

use super::{BlockStream, Transport};
use crate::config::ToriiConfig;
use crate::error::{Error, Result};
use crate::queries::{BlockQueryResponse, BlockQueryResponseKind, BlocksQuery, Query, QueryResponse};
use crate::status::StatusStream;
use crate::types::{Block, ToriiResponse, Transaction, TxHash, TxList, TxStatusRequest};
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tonic::client::Grpc;
use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

const TORII: &str = "/iroha.protocol.CommandService_v1/Torii";
const LIST_TORII: &str = "/iroha.protocol.CommandService_v1/ListTorii";
const STATUS: &str = "/iroha.protocol.CommandService_v1/Status";
const STATUS_STREAM: &str = "/iroha.protocol.CommandService_v1/StatusStream";
const FIND: &str = "/iroha.protocol.QueryService_v1/Find";
const FETCH_COMMITS: &str = "/iroha.protocol.QueryService_v1/FetchCommits";

/// Transport over a tonic channel
#[derive(Debug, Clone)]
pub struct GrpcTransport {
    channel: Channel,
}

impl GrpcTransport {
    /// Connect to the engine at `config.address`
    pub async fn connect(config: &ToriiConfig) -> Result<Self> {
        info!("Connecting to engine at {}", config.address);
        let channel = Endpoint::from_shared(config.address.clone())?
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .connect()
            .await?;
        Ok(Self { channel })
    }

    pub fn from_channel(channel: Channel) -> Self {
        Self { channel }
    }

    async fn client(&self) -> Result<Grpc<Channel>> {
        let mut grpc = Grpc::new(self.channel.clone());
        grpc.ready()
            .await
            .map_err(|e| Error::Transport(format!("service was not ready: {}", e)))?;
        Ok(grpc)
    }

    async fn unary<Req, Resp>(&self, path: &'static str, request: Req) -> Result<Resp>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        debug!("gRPC call {}", path);
        let mut grpc = self.client().await?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                codec,
            )
            .await?;
        Ok(response.into_inner())
    }

    async fn server_streaming<Req, Resp>(
        &self,
        path: &'static str,
        request: Req,
    ) -> Result<Streaming<Resp>>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        debug!("gRPC stream {}", path);
        let mut grpc = self.client().await?;
        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc
            .server_streaming(
                tonic::Request::new(request),
                PathAndQuery::from_static(path),
                codec,
            )
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    async fn submit(&self, tx: Transaction) -> Result<()> {
        self.unary::<Transaction, ()>(TORII, tx).await
    }

    async fn submit_batch(&self, txs: Vec<Transaction>) -> Result<()> {
        self.unary::<TxList, ()>(LIST_TORII, TxList { transactions: txs })
            .await
    }

    async fn query(&self, query: Query) -> Result<QueryResponse> {
        self.unary(FIND, query).await
    }

    async fn status(&self, hash: &TxHash) -> Result<ToriiResponse> {
        let request = TxStatusRequest {
            tx_hash: hash.to_hex(),
        };
        self.unary(STATUS, request).await
    }

    async fn stream_status(&self, hash: &TxHash) -> Result<StatusStream> {
        let request = TxStatusRequest {
            tx_hash: hash.to_hex(),
        };
        let stream = self
            .server_streaming::<TxStatusRequest, ToriiResponse>(STATUS_STREAM, request)
            .await?;
        Ok(StatusStream::new(
            *hash,
            stream.map(|item| item.map_err(Error::from)),
        ))
    }

    async fn stream_blocks(&self, query: BlocksQuery) -> Result<BlockStream> {
        let stream = self
            .server_streaming::<BlocksQuery, BlockQueryResponse>(FETCH_COMMITS, query)
            .await?;
        Ok(Box::pin(stream.map(|item| block_from_response(item?))))
    }
}

fn block_from_response(response: BlockQueryResponse) -> Result<Block> {
    match response.response {
        Some(BlockQueryResponseKind::BlockResponse(r)) => r
            .block
            .ok_or_else(|| Error::UnexpectedResponse("block response without block".to_string())),
        Some(BlockQueryResponseKind::BlockErrorResponse(e)) => Err(Error::QueryRejected(e.message)),
        None => Err(Error::UnexpectedResponse("empty block query response".to_string())),
    }
}
