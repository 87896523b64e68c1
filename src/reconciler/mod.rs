//! Reconciler Module
//!
//! Counterparty state machine for pending multi-signature batches:
//! - PendingReconciler: observe / accept / decline / resubmit / await_outcome
//! - ReconcileState: per-transaction state from this party's point of view

mod reconciler;
mod state;

pub use reconciler::{ForeignSignatures, PendingBatch, PendingReconciler, PendingView};
pub use state::ReconcileState;

#[cfg(test)]
mod tests;
