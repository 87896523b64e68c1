//! API Server Module
//!
//! JSON-RPC 2.0 server in front of the sandbox ledger. Wire types travel as
//! their serde JSON form.
//!
//! # Methods
//! - `sendTransaction`: one `Transaction`
//! - `sendTransactions`: a `TxList` (batches travel this way)
//! - `query`: a signed `Query`, answered with a `QueryResponse`
//! - `getTransactionStatus`: a `TxStatusRequest`, answered with a `ToriiResponse`
//! - `getPendingTransactions`: a signed `GetPendingTransactions` query

use crate::{
    config::ApiConfig,
    ledger::Ledger,
    queries::{Query, QueryKind},
    types::{Transaction, TxHash, TxList, TxStatusRequest},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const ENGINE_ERROR: i32 = -32000;

/// Shared application state that is accessible across all request handlers
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Ledger>,
}

/// The main API server struct
pub struct Server {
    config: ApiConfig,
    state: AppState,
}

impl Server {
    /// Creates a new API server instance
    ///
    /// # Arguments
    /// * `config` - Listening address
    /// * `ledger` - Engine shared with the expiry loop
    pub fn new(config: ApiConfig, ledger: Arc<Ledger>) -> Self {
        Self {
            config,
            state: AppState { ledger },
        }
    }

    /// Router with the single POST endpoint at "/"
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(handle_rpc))
            .with_state(self.state.clone())
    }

    /// Starts the API server and begins listening for incoming requests
    ///
    /// # Returns
    /// `Ok(())` when the server shuts down, or an error if binding fails
    pub async fn start(self) -> anyhow::Result<()> {
        let app = self.router();

        let addr = format!("{}:{}", self.config.host, self.config.port);
        info!("API server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// JSON-RPC 2.0 request structure
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Value,
}

/// JSON-RPC 2.0 response structure
///
/// Either `result` or `error` is populated, never both.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Value,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Value, result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Self {
                jsonrpc: "2.0".to_string(),
                result: Some(result),
                error: None,
                id,
            },
            Err(e) => {
                error!("Failed to encode result: {}", e);
                Self::failure(id, ENGINE_ERROR, format!("Failed to encode result: {}", e))
            }
        }
    }

    fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}

/// Main RPC request handler, routes by method name
async fn handle_rpc(
    State(state): State<AppState>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    info!("Received RPC request: {}", request.method);

    let JsonRpcRequest {
        method, params, id, ..
    } = request;
    let response = match method.as_str() {
        "sendTransaction" => send_transaction(&state, params, id).await,
        "sendTransactions" => send_transactions(&state, params, id).await,
        "query" => query(&state, params, id).await,
        "getTransactionStatus" => transaction_status(&state, params, id).await,
        "getPendingTransactions" => pending_transactions(&state, params, id).await,
        _ => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "Method not found"),
    };
    Json(response)
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| {
        warn!("Failed to deserialize params: {}", e);
        format!("Invalid params: {}", e)
    })
}

async fn submit(state: &AppState, transactions: Vec<Transaction>, id: Value) -> JsonRpcResponse {
    match state.ledger.submit(transactions).await {
        Ok(hashes) => {
            let hashes: Vec<String> = hashes.iter().map(TxHash::to_hex).collect();
            JsonRpcResponse::success(id, json!({ "tx_hashes": hashes }))
        }
        Err(e) => {
            warn!("Submission rejected: {}", e);
            JsonRpcResponse::failure(id, ENGINE_ERROR, e.to_string())
        }
    }
}

async fn send_transaction(state: &AppState, params: Value, id: Value) -> JsonRpcResponse {
    match parse::<Transaction>(params) {
        Ok(tx) => submit(state, vec![tx], id).await,
        Err(message) => JsonRpcResponse::failure(id, INVALID_PARAMS, message),
    }
}

async fn send_transactions(state: &AppState, params: Value, id: Value) -> JsonRpcResponse {
    match parse::<TxList>(params) {
        Ok(list) if list.transactions.is_empty() => {
            JsonRpcResponse::failure(id, INVALID_PARAMS, "Empty transaction list")
        }
        Ok(list) => submit(state, list.transactions, id).await,
        Err(message) => JsonRpcResponse::failure(id, INVALID_PARAMS, message),
    }
}

async fn query(state: &AppState, params: Value, id: Value) -> JsonRpcResponse {
    match parse::<Query>(params) {
        Ok(query) => JsonRpcResponse::success(id, state.ledger.find(&query).await),
        Err(message) => JsonRpcResponse::failure(id, INVALID_PARAMS, message),
    }
}

async fn transaction_status(state: &AppState, params: Value, id: Value) -> JsonRpcResponse {
    let request = match parse::<TxStatusRequest>(params) {
        Ok(request) => request,
        Err(message) => return JsonRpcResponse::failure(id, INVALID_PARAMS, message),
    };
    match TxHash::from_hex(&request.tx_hash) {
        Some(hash) => JsonRpcResponse::success(id, state.ledger.status(&hash).await),
        None => JsonRpcResponse::failure(
            id,
            INVALID_PARAMS,
            format!("Malformed transaction hash '{}'", request.tx_hash),
        ),
    }
}

async fn pending_transactions(state: &AppState, params: Value, id: Value) -> JsonRpcResponse {
    let query = match parse::<Query>(params) {
        Ok(query) => query,
        Err(message) => return JsonRpcResponse::failure(id, INVALID_PARAMS, message),
    };
    if !matches!(query.kind(), Some(QueryKind::GetPendingTransactions(_))) {
        return JsonRpcResponse::failure(
            id,
            INVALID_PARAMS,
            "Expected a GetPendingTransactions query",
        );
    }
    JsonRpcResponse::success(id, state.ledger.find(&query).await)
}
