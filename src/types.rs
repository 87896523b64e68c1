//! Wire Model Module
//!
//! Transactions, batch meta, statuses and blocks as the ledger engine encodes
//! them. Every message mirrors the engine's protobuf schema field-for-field so
//! that `prost` produces byte-identical payloads (the reduced hash depends on
//! it). Serde derives are used by the JSON-RPC API.

use crate::commands::Command;
use crate::crypto::{self, Signable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// SHA3-256 digest used for transaction, reduced-payload and block identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex-encoded 32-byte hash
    pub fn from_hex(value: &str) -> Option<Self> {
        let bytes = hex::decode(value).ok()?;
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        TxHash::from_hex(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid hash: {}", value)))
    }
}

/// A single (public key, signature) pair, both hex encoded
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ::prost::Message)]
pub struct Signature {
    #[prost(string, tag = "1")]
    pub public_key: String,
    #[prost(string, tag = "2")]
    pub signature: String,
}

/// The part of a transaction that identifies it before batching and signing
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct ReducedPayload {
    #[prost(message, repeated, tag = "1")]
    pub commands: Vec<Command>,
    #[prost(string, tag = "2")]
    pub creator_account_id: String,
    #[prost(uint64, tag = "3")]
    pub created_time: u64,
    #[prost(uint32, tag = "4")]
    pub quorum: u32,
}

/// Batch type
///
/// - `Atomic`: either every member commits or none does
/// - `Ordered`: members are applied in sequence, each on its own merits
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ::prost::Enumeration)]
#[repr(i32)]
pub enum BatchType {
    Atomic = 0,
    Ordered = 1,
}

impl BatchType {
    pub fn from_atomic(atomic: bool) -> Self {
        if atomic { BatchType::Atomic } else { BatchType::Ordered }
    }
}

/// Batch descriptor shared (by value) between all members of a batch
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ::prost::Message)]
pub struct BatchMeta {
    #[prost(enumeration = "BatchType", tag = "1")]
    pub r#type: i32,
    /// Hex-encoded reduced hashes of every member, in member order
    #[prost(string, repeated, tag = "2")]
    pub reduced_hashes: Vec<String>,
}

impl BatchMeta {
    pub fn new(batch_type: BatchType, reduced_hashes: Vec<String>) -> Self {
        Self {
            r#type: batch_type as i32,
            reduced_hashes,
        }
    }

    pub fn batch_type(&self) -> BatchType {
        self.r#type()
    }

    pub fn is_atomic(&self) -> bool {
        self.batch_type() == BatchType::Atomic
    }
}

/// Signed part of a transaction: reduced payload plus optional batch meta
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Payload {
    #[prost(message, optional, tag = "1")]
    pub reduced_payload: Option<ReducedPayload>,
    #[prost(message, optional, tag = "5")]
    pub batch: Option<BatchMeta>,
}

/// Ledger transaction
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Transaction {
    #[prost(message, optional, tag = "1")]
    pub payload: Option<Payload>,
    #[prost(message, repeated, tag = "2")]
    pub signatures: Vec<Signature>,
}

static EMPTY_REDUCED_PAYLOAD: ReducedPayload = ReducedPayload {
    commands: Vec::new(),
    creator_account_id: String::new(),
    created_time: 0,
    quorum: 0,
};

impl Transaction {
    /// Wrap a reduced payload into an unsigned transaction without batch meta
    pub fn from_reduced(reduced_payload: ReducedPayload) -> Self {
        Self {
            payload: Some(Payload {
                reduced_payload: Some(reduced_payload),
                batch: None,
            }),
            signatures: Vec::new(),
        }
    }

    pub fn reduced_payload(&self) -> &ReducedPayload {
        self.payload
            .as_ref()
            .and_then(|p| p.reduced_payload.as_ref())
            .unwrap_or(&EMPTY_REDUCED_PAYLOAD)
    }

    pub fn creator_account_id(&self) -> &str {
        &self.reduced_payload().creator_account_id
    }

    pub fn commands(&self) -> &[Command] {
        &self.reduced_payload().commands
    }

    pub fn quorum(&self) -> u32 {
        self.reduced_payload().quorum
    }

    pub fn created_time(&self) -> u64 {
        self.reduced_payload().created_time
    }

    pub fn batch_meta(&self) -> Option<&BatchMeta> {
        self.payload.as_ref().and_then(|p| p.batch.as_ref())
    }

    /// Replace the batch meta. Existing signatures become stale.
    pub fn set_batch_meta(&mut self, meta: BatchMeta) {
        self.payload.get_or_insert_with(Payload::default).batch = Some(meta);
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Hash over the full payload; identity used for status tracking
    pub fn hash(&self) -> TxHash {
        crypto::hash(Signable::Transaction(self))
    }

    /// Hash over the reduced payload; stable under batching and signing
    pub fn reduced_hash(&self) -> TxHash {
        crypto::reduced_hash(self)
    }
}

/// List of transactions submitted in one call (batches travel this way)
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct TxList {
    #[prost(message, repeated, tag = "1")]
    pub transactions: Vec<Transaction>,
}

/// Transaction status as reported by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ::prost::Enumeration)]
#[repr(i32)]
pub enum TxStatus {
    StatelessValidationFailed = 0,
    StatelessValidationSuccess = 1,
    StatefulValidationFailed = 2,
    StatefulValidationSuccess = 3,
    Rejected = 4,
    Committed = 5,
    MstExpired = 6,
    NotReceived = 7,
    MstPending = 8,
    EnoughSignaturesCollected = 9,
}

impl TxStatus {
    /// Position in the status progression. Streams never go backwards.
    pub fn rank(self) -> u8 {
        match self {
            TxStatus::NotReceived => 0,
            TxStatus::StatelessValidationSuccess => 1,
            TxStatus::MstPending => 2,
            TxStatus::EnoughSignaturesCollected => 3,
            TxStatus::StatefulValidationSuccess | TxStatus::StatefulValidationFailed => 4,
            TxStatus::StatelessValidationFailed
            | TxStatus::Rejected
            | TxStatus::Committed
            | TxStatus::MstExpired => 5,
        }
    }

    /// Final statuses: nothing follows them on a status stream
    pub fn is_terminal(self) -> bool {
        self.rank() == 5
    }

    pub fn is_committed(self) -> bool {
        self == TxStatus::Committed
    }

    pub fn name(self) -> &'static str {
        match self {
            TxStatus::StatelessValidationFailed => "STATELESS_VALIDATION_FAILED",
            TxStatus::StatelessValidationSuccess => "STATELESS_VALIDATION_SUCCESS",
            TxStatus::StatefulValidationFailed => "STATEFUL_VALIDATION_FAILED",
            TxStatus::StatefulValidationSuccess => "STATEFUL_VALIDATION_SUCCESS",
            TxStatus::Rejected => "REJECTED",
            TxStatus::Committed => "COMMITTED",
            TxStatus::MstExpired => "MST_EXPIRED",
            TxStatus::NotReceived => "NOT_RECEIVED",
            TxStatus::MstPending => "MST_PENDING",
            TxStatus::EnoughSignaturesCollected => "ENOUGH_SIGNATURES_COLLECTED",
        }
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct TxStatusRequest {
    #[prost(string, tag = "1")]
    pub tx_hash: String,
}

/// One status observation for one transaction
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct ToriiResponse {
    #[prost(enumeration = "TxStatus", tag = "1")]
    pub tx_status: i32,
    #[prost(string, tag = "2")]
    pub tx_hash: String,
    #[prost(string, tag = "3")]
    pub error_message: String,
    #[prost(uint32, tag = "4")]
    pub failed_cmd_index: u32,
    #[prost(uint32, tag = "5")]
    pub error_code: u32,
}

impl ToriiResponse {
    pub fn new(hash: &TxHash, status: TxStatus) -> Self {
        Self {
            tx_status: status as i32,
            tx_hash: hash.to_hex(),
            ..Default::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn status(&self) -> TxStatus {
        self.tx_status()
    }

    pub fn hash(&self) -> Option<TxHash> {
        TxHash::from_hex(&self.tx_hash)
    }
}

/// Committed block, versioned the same way the engine wraps it
#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    pub block_v1: Option<BlockV1>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct BlockV1 {
    #[prost(message, optional, tag = "1")]
    pub payload: Option<BlockPayload>,
    #[prost(message, repeated, tag = "2")]
    pub signatures: Vec<Signature>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize, ::prost::Message)]
pub struct BlockPayload {
    #[prost(message, repeated, tag = "1")]
    pub transactions: Vec<Transaction>,
    #[prost(uint32, tag = "2")]
    pub tx_number: u32,
    #[prost(uint64, tag = "3")]
    pub height: u64,
    #[prost(string, tag = "5")]
    pub prev_block_hash: String,
    #[prost(uint64, tag = "6")]
    pub created_time: u64,
    #[prost(string, repeated, tag = "7")]
    pub rejected_transactions_hashes: Vec<String>,
}

impl Block {
    pub fn payload(&self) -> Option<&BlockPayload> {
        self.block_v1.as_ref().and_then(|b| b.payload.as_ref())
    }

    pub fn height(&self) -> u64 {
        self.payload().map(|p| p.height).unwrap_or_default()
    }

    pub fn hash(&self) -> TxHash {
        crypto::hash(Signable::Block(self))
    }
}
