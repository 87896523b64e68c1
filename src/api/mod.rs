//! API Module
//!
//! JSON-RPC front end of the sandbox engine. Remote parties submit
//! transactions and batches, run queries and poll statuses through it.

mod server;
pub use server::Server;
