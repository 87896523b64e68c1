//! Error Module
//!
//! Error taxonomy shared by every component:
//! - `Validation`: local pre-flight failures, never sent to the network
//! - `InvalidKey`: malformed key material
//! - `Transport`: connectivity or RPC failure, left to the caller to retry
//! - `Rejected`: authoritative rejection reported by the engine

use crate::types::{TxHash, TxStatus};
use thiserror::Error;

/// Local validation errors
///
/// Raised before anything reaches the engine. The caller fixes the input and
/// tries again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Transaction must contain at least one command")]
    EmptyCommands,

    #[error("Quorum should be within range (0, {max}], passed value: {got}")]
    QuorumOutOfRange { got: u32, max: u32 },

    #[error("Wrongly formed account_id, passed value: '{0}'")]
    InvalidAccountId(String),

    #[error("Wrongly formed asset_id, passed value: '{0}'")]
    InvalidAssetId(String),

    #[error("Wrongly formed {field}, passed value: '{value}'")]
    InvalidName { field: &'static str, value: String },

    #[error("Amount must be a positive decimal, passed value: '{0}'")]
    InvalidAmount(String),

    #[error("Public key has wrong format: '{0}'")]
    InvalidPublicKey(String),

    #[error("Detail value size should be less or equal {max}, passed size: {got}")]
    DetailTooLong { got: usize, max: usize },

    #[error("Description size should be less or equal {max}, passed size: {got}")]
    DescriptionTooLong { got: usize, max: usize },

    #[error("Peer address is not a valid host:port pair: '{0}'")]
    InvalidPeerAddress(String),

    #[error("Command at index {0} is empty")]
    EmptyCommand(usize),

    #[error("Permission set should contain at least one permission")]
    EmptyPermissions,

    #[error("bad timestamp: created_time must be set")]
    MissingCreatedTime,

    #[error("bad timestamp: too old, timestamp: {timestamp}, now: {now}")]
    TooOld { timestamp: u64, now: u64 },

    #[error("bad timestamp: sent from future, timestamp: {timestamp}, now: {now}")]
    FromFuture { timestamp: u64, now: u64 },

    #[error("Query counter should be > 0")]
    ZeroCounter,

    #[error("Cannot tie an empty set of transactions into a batch")]
    EmptyBatch,

    #[error("Batch contains transaction with reduced hash {0} more than once")]
    DuplicateReducedHash(String),

    #[error("Reduced hash {0} is not a 32-byte hex string")]
    MalformedReducedHash(String),

    #[error("Transaction {0} is already signed; batch meta must be set before signing")]
    AlreadySigned(String),

    #[error("Batch contains {got} transactions, maximum is {max}")]
    BatchTooLarge { got: usize, max: usize },

    #[error("There is no batch meta in provided transactions")]
    MissingBatchMeta,

    #[error("Hashes of provided transactions and ones in batch_meta are different")]
    BatchHashMismatch,

    #[error("Transaction batch should contain at least one signature")]
    UnsignedBatch,

    #[error("Wrong signature from key {0}")]
    BadSignature(String),
}

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Transaction {hash} finished with {status}: {reason}")]
    Rejected {
        hash: TxHash,
        status: TxStatus,
        reason: String,
    },

    #[error("Query rejected: {0}")]
    QueryRejected(String),

    #[error("Illegal state transition for {hash}: {from} -> {to}")]
    IllegalTransition {
        hash: TxHash,
        from: &'static str,
        to: &'static str,
    },

    #[error("Status stream for {0} closed before a terminal status")]
    StreamClosed(TxHash),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        Error::Transport(format!("{:?}: {}", status.code(), status.message()))
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
