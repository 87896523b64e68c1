//! Transaction Pool Module
//!
//! This module manages batches waiting for signatures:
//! - MstPool: incomplete multi-signature batches, merged per batch identity

mod mst_pool;

pub use mst_pool::{MstPool, MstState};
