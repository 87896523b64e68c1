//! Transaction Builder Module
//!
//! Assembles unsigned transactions and queries. Building validates every
//! field the engine would check statelessly, so malformed input fails here
//! instead of after a network round trip.

mod query;
mod transaction;

pub use query::QueryBuilder;
pub use transaction::{build, TransactionBuilder};
