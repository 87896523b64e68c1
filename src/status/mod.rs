//! Status Stream Consumer Module
//!
//! - StatusStream: relays one transaction's statuses and stops at the first
//!   terminal status
//! - BatchTracker: maps terminal statuses back to batch members and computes
//!   the batch outcome

mod consumer;
mod tracker;

pub use consumer::{ResponseStream, StatusStream};
pub use tracker::{track, BatchOutcome, BatchTracker, Rejection};
