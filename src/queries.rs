//! Queries Module
//!
//! Signed read requests, their responses, and the blocks subscription request.

use crate::types::{Block, Signature, Transaction};
use serde::{Deserialize, Serialize};

/// Metadata common to every query: who asks, when, and the per-creator counter
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct QueryPayloadMeta {
    #[prost(uint64, tag = "1")]
    pub created_time: u64,
    #[prost(string, tag = "2")]
    pub creator_account_id: String,
    #[prost(uint64, tag = "3")]
    pub query_counter: u64,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct QueryPayload {
    #[prost(message, optional, tag = "1")]
    pub meta: Option<QueryPayloadMeta>,
    #[prost(oneof = "QueryKind", tags = "3, 4, 5, 7, 8, 9, 12, 13")]
    pub query: Option<QueryKind>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Oneof)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    #[prost(message, tag = "3")]
    GetAccount(GetAccount),
    #[prost(message, tag = "4")]
    GetSignatories(GetSignatories),
    #[prost(message, tag = "5")]
    GetAccountTransactions(GetAccountTransactions),
    #[prost(message, tag = "7")]
    GetTransactions(GetTransactions),
    #[prost(message, tag = "8")]
    GetAccountAssets(GetAccountAssets),
    #[prost(message, tag = "9")]
    GetAccountDetail(GetAccountDetail),
    #[prost(message, tag = "12")]
    GetAssetInfo(GetAssetInfo),
    #[prost(message, tag = "13")]
    GetPendingTransactions(GetPendingTransactions),
}

impl QueryKind {
    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::GetAccount(_) => "GetAccount",
            QueryKind::GetSignatories(_) => "GetSignatories",
            QueryKind::GetAccountTransactions(_) => "GetAccountTransactions",
            QueryKind::GetTransactions(_) => "GetTransactions",
            QueryKind::GetAccountAssets(_) => "GetAccountAssets",
            QueryKind::GetAccountDetail(_) => "GetAccountDetail",
            QueryKind::GetAssetInfo(_) => "GetAssetInfo",
            QueryKind::GetPendingTransactions(_) => "GetPendingTransactions",
        }
    }

    pub fn get_account(account_id: impl Into<String>) -> Self {
        QueryKind::GetAccount(GetAccount {
            account_id: account_id.into(),
        })
    }

    pub fn get_signatories(account_id: impl Into<String>) -> Self {
        QueryKind::GetSignatories(GetSignatories {
            account_id: account_id.into(),
        })
    }

    pub fn get_account_transactions(account_id: impl Into<String>) -> Self {
        QueryKind::GetAccountTransactions(GetAccountTransactions {
            account_id: account_id.into(),
            pagination_meta: None,
        })
    }

    pub fn get_transactions(tx_hashes: Vec<String>) -> Self {
        QueryKind::GetTransactions(GetTransactions { tx_hashes })
    }

    pub fn get_account_assets(account_id: impl Into<String>) -> Self {
        QueryKind::GetAccountAssets(GetAccountAssets {
            account_id: account_id.into(),
        })
    }

    pub fn get_account_detail(account_id: impl Into<String>) -> Self {
        QueryKind::GetAccountDetail(GetAccountDetail {
            account_id: account_id.into(),
            ..Default::default()
        })
    }

    pub fn get_asset_info(asset_id: impl Into<String>) -> Self {
        QueryKind::GetAssetInfo(GetAssetInfo {
            asset_id: asset_id.into(),
        })
    }

    pub fn get_pending_transactions() -> Self {
        QueryKind::GetPendingTransactions(GetPendingTransactions {})
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Query {
    #[prost(message, optional, tag = "1")]
    pub payload: Option<QueryPayload>,
    #[prost(message, optional, tag = "2")]
    pub signature: Option<Signature>,
}

impl Query {
    pub fn meta(&self) -> Option<&QueryPayloadMeta> {
        self.payload.as_ref().and_then(|p| p.meta.as_ref())
    }

    pub fn kind(&self) -> Option<&QueryKind> {
        self.payload.as_ref().and_then(|p| p.query.as_ref())
    }

    pub fn creator_account_id(&self) -> &str {
        self.meta().map(|m| m.creator_account_id.as_str()).unwrap_or("")
    }
}

/// Subscription request for committed blocks
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct BlocksQuery {
    #[prost(message, optional, tag = "1")]
    pub meta: Option<QueryPayloadMeta>,
    #[prost(message, optional, tag = "2")]
    pub signature: Option<Signature>,
}

impl BlocksQuery {
    pub fn creator_account_id(&self) -> &str {
        self.meta
            .as_ref()
            .map(|m| m.creator_account_id.as_str())
            .unwrap_or("")
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct TxPaginationMeta {
    #[prost(uint32, tag = "1")]
    pub page_size: u32,
    #[prost(string, tag = "2")]
    pub first_tx_hash: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetAccount {
    #[prost(string, tag = "1")]
    pub account_id: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetSignatories {
    #[prost(string, tag = "1")]
    pub account_id: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetAccountTransactions {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(message, optional, tag = "2")]
    pub pagination_meta: Option<TxPaginationMeta>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetTransactions {
    #[prost(string, repeated, tag = "1")]
    pub tx_hashes: Vec<String>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetAccountAssets {
    #[prost(string, tag = "1")]
    pub account_id: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetAccountDetail {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub key: String,
    #[prost(string, tag = "3")]
    pub writer: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetAssetInfo {
    #[prost(string, tag = "1")]
    pub asset_id: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct GetPendingTransactions {}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct QueryResponse {
    #[prost(oneof = "QueryResponseKind", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub response: Option<QueryResponseKind>,
    #[prost(string, tag = "10")]
    pub query_hash: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Oneof)]
#[serde(rename_all = "snake_case")]
pub enum QueryResponseKind {
    #[prost(message, tag = "1")]
    AccountAssetsResponse(AccountAssetResponse),
    #[prost(message, tag = "2")]
    AccountDetailResponse(AccountDetailResponse),
    #[prost(message, tag = "3")]
    AccountResponse(AccountResponse),
    #[prost(message, tag = "4")]
    ErrorResponse(ErrorResponse),
    #[prost(message, tag = "5")]
    SignatoriesResponse(SignatoriesResponse),
    #[prost(message, tag = "6")]
    TransactionsResponse(TransactionsResponse),
    #[prost(message, tag = "7")]
    AssetResponse(AssetResponse),
}

impl QueryResponse {
    pub fn new(query_hash: String, response: QueryResponseKind) -> Self {
        Self {
            response: Some(response),
            query_hash,
        }
    }

    pub fn error(query_hash: String, reason: ErrorReason, message: impl Into<String>) -> Self {
        Self::new(
            query_hash,
            QueryResponseKind::ErrorResponse(ErrorResponse {
                reason: reason as i32,
                message: message.into(),
                error_code: 0,
            }),
        )
    }

    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match &self.response {
            Some(QueryResponseKind::ErrorResponse(e)) => Some(e),
            _ => None,
        }
    }

    /// Transactions carried by a transactions response, if that is what this is
    pub fn into_transactions(self) -> Option<Vec<Transaction>> {
        match self.response {
            Some(QueryResponseKind::TransactionsResponse(r)) => Some(r.transactions),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AccountAsset {
    #[prost(string, tag = "1")]
    pub asset_id: String,
    #[prost(string, tag = "2")]
    pub account_id: String,
    #[prost(string, tag = "3")]
    pub balance: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AccountAssetResponse {
    #[prost(message, repeated, tag = "1")]
    pub account_assets: Vec<AccountAsset>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AccountDetailResponse {
    /// JSON object: writer -> { key -> value }
    #[prost(string, tag = "1")]
    pub detail: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Account {
    #[prost(string, tag = "1")]
    pub account_id: String,
    #[prost(string, tag = "2")]
    pub domain_id: String,
    #[prost(uint32, tag = "3")]
    pub quorum: u32,
    #[prost(string, tag = "4")]
    pub json_data: String,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AccountResponse {
    #[prost(message, optional, tag = "1")]
    pub account: Option<Account>,
    #[prost(string, repeated, tag = "2")]
    pub account_roles: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ::prost::Enumeration)]
#[repr(i32)]
pub enum ErrorReason {
    StatelessInvalid = 0,
    StatefulInvalid = 1,
    NoAccount = 2,
    NoAccountAssets = 3,
    NoAccountDetail = 4,
    NoSignatories = 5,
    NotSupported = 6,
    NoAsset = 7,
    NoRoles = 8,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct ErrorResponse {
    #[prost(enumeration = "ErrorReason", tag = "1")]
    pub reason: i32,
    #[prost(string, tag = "2")]
    pub message: String,
    #[prost(uint32, tag = "3")]
    pub error_code: u32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct SignatoriesResponse {
    #[prost(string, repeated, tag = "1")]
    pub keys: Vec<String>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct TransactionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub transactions: Vec<Transaction>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Asset {
    #[prost(string, tag = "1")]
    pub asset_id: String,
    #[prost(string, tag = "2")]
    pub domain_id: String,
    #[prost(uint32, tag = "3")]
    pub precision: u32,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct AssetResponse {
    #[prost(message, optional, tag = "1")]
    pub asset: Option<Asset>,
}

/// One item of the blocks stream
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct BlockQueryResponse {
    #[prost(oneof = "BlockQueryResponseKind", tags = "1, 2")]
    pub response: Option<BlockQueryResponseKind>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Oneof)]
#[serde(rename_all = "snake_case")]
pub enum BlockQueryResponseKind {
    #[prost(message, tag = "1")]
    BlockResponse(BlockResponse),
    #[prost(message, tag = "2")]
    BlockErrorResponse(BlockErrorResponse),
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct BlockResponse {
    #[prost(message, optional, tag = "1")]
    pub block: Option<Block>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct BlockErrorResponse {
    #[prost(string, tag = "1")]
    pub message: String,
}
