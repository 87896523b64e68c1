//! Counterparty view of a pending transaction

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ReconcileState {
    /// Never returned by a pending query
    #[default]
    Unseen,
    /// Returned by a pending query, not decided yet
    Observed,
    /// Signed by this party, ready to go back to the engine
    Accepted,
    /// Prepared so that it fails stateful validation downstream
    Declined,
    /// Sent back to the engine, outcome unknown
    Resubmitted,
    Committed,
    Rejected,
}

impl ReconcileState {
    pub fn name(self) -> &'static str {
        match self {
            ReconcileState::Unseen => "Unseen",
            ReconcileState::Observed => "Observed",
            ReconcileState::Accepted => "Accepted",
            ReconcileState::Declined => "Declined",
            ReconcileState::Resubmitted => "Resubmitted",
            ReconcileState::Committed => "Committed",
            ReconcileState::Rejected => "Rejected",
        }
    }

    pub fn is_final(self) -> bool {
        matches!(self, ReconcileState::Committed | ReconcileState::Rejected)
    }
}
