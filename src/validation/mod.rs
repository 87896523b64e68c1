//! Validation Module
//!
//! Stateless checks shared by the client and the sandbox engine:
//! - field grammar (account ids, asset ids, names, keys, amounts)
//! - quorum range and the `created_time` freshness window
//! - transaction, batch and query well-formedness including signatures

mod fields;
mod validator;

pub use fields::{FieldValidator, MAX_DESCRIPTION_SIZE, MAX_DETAIL_VALUE_SIZE};
pub use validator::Validator;

#[cfg(test)]
mod tests;
