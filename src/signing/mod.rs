//! Signature Accumulator Module
//!
//! Independent signing passes over transactions and queries. Each pass
//! signs the payload as it is at that moment.

mod accumulator;

pub use accumulator::{
    sign, sign_blocks_query, sign_hex, sign_query, sign_with_all, verify_transaction,
};
