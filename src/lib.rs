//! Client-side toolkit for composing transaction batches and coordinating
//! multi-signature transactions against an Iroha-style ledger, together with
//! an in-process sandbox engine that honors the same contract.

pub mod types; // Wire messages: transactions, batch meta, statuses, blocks.
pub mod commands; // Ledger commands carried by transactions.
pub mod queries; // Query requests and responses.
pub mod error; // Crate-wide error types.
pub mod crypto; // Hashing and ed25519 keys.
pub mod config; // Loads coordinator and engine configuration.
pub mod validation; // Stateless checks shared by the builders and the engine.
pub mod builder; // Transaction and query builders.
pub mod batch; // Batch meta composition and batch grouping.
pub mod signing; // Signature accumulation.
pub mod status; // Status stream consumption and batch outcome tracking.
pub mod transport; // Engine transport trait and the gRPC implementation.
pub mod client; // Per-party client session.
pub mod reconciler; // Counterparty side of pending multi-signature batches.
pub mod state; // World state and command execution of the sandbox engine.
pub mod pool; // Pending multi-signature pool.
pub mod registry; // Committed block storage.
pub mod ledger; // Sandbox engine wiring.
pub mod api; // JSON-RPC server in front of the sandbox engine.

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types for easier access.
pub use client::Client;
pub use config::Config;
pub use error::{Error, Result, ValidationError};
pub use ledger::{Ledger, SandboxTransport};
pub use transport::{GrpcTransport, Transport};
pub use types::*;
