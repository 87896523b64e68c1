//! Batch Meta Composer Module
//!
//! This module handles batch formation:
//! - tie: stamps a shared batch meta on a set of unsigned transactions
//! - batch_hash / batch_id: batch identity from the members' reduced hashes
//! - BatchSequence: regroups a flat transaction list into batches

mod composer;
mod sequence;

pub use composer::{batch_hash, batch_id, tie};
pub use sequence::{BatchSequence, TxBatch};
