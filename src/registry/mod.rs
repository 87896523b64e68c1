//! Block Registry Module
//!
//! Stores committed blocks and indexes their transactions so queries can
//! find them without scanning the chain.

mod block_store;
pub use block_store::BlockStore;
