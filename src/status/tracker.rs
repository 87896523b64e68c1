//! Correlation of terminal statuses back to batch members

use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{ToriiResponse, TxHash, TxStatus};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// A member that reached a terminal status other than COMMITTED
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub hash: TxHash,
    pub status: TxStatus,
    pub reason: String,
}

/// Batch-level outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchOutcome {
    /// Every member committed
    AllCommitted,
    /// At least one member ended without committing
    AnyRejected {
        committed: Vec<TxHash>,
        rejected: Vec<Rejection>,
    },
    /// No rejection seen, but some members have no terminal status yet
    Partial {
        committed: Vec<TxHash>,
        pending: Vec<TxHash>,
    },
}

impl BatchOutcome {
    pub fn is_all_committed(&self) -> bool {
        matches!(self, BatchOutcome::AllCommitted)
    }
}

/// Terminal statuses of a set of transactions
#[derive(Debug, Clone, Default)]
pub struct BatchTracker {
    members: Vec<TxHash>,
    terminal: HashMap<TxHash, ToriiResponse>,
}

impl BatchTracker {
    pub fn new(members: Vec<TxHash>) -> Self {
        Self {
            members,
            terminal: HashMap::new(),
        }
    }

    pub fn members(&self) -> &[TxHash] {
        &self.members
    }

    /// Record one observation
    ///
    /// # Returns
    /// `true` if the observation is a terminal status of a member seen for
    /// the first time. Later terminal statuses for the same member are
    /// treated as duplicates.
    pub fn record(&mut self, response: &ToriiResponse) -> bool {
        let Some(hash) = response.hash() else {
            return false;
        };
        if !response.status().is_terminal() || !self.members.contains(&hash) {
            return false;
        }
        if self.terminal.contains_key(&hash) {
            return false;
        }
        self.terminal.insert(hash, response.clone());
        true
    }

    pub fn status(&self, hash: &TxHash) -> Option<TxStatus> {
        self.terminal.get(hash).map(|r| r.status())
    }

    pub fn is_settled(&self) -> bool {
        self.members.iter().all(|h| self.terminal.contains_key(h))
    }

    pub fn outcome(&self) -> BatchOutcome {
        let mut committed = Vec::new();
        let mut rejected = Vec::new();
        let mut pending = Vec::new();

        for hash in &self.members {
            match self.terminal.get(hash) {
                Some(r) if r.status().is_committed() => committed.push(*hash),
                Some(r) => rejected.push(Rejection {
                    hash: *hash,
                    status: r.status(),
                    reason: r.error_message.clone(),
                }),
                None => pending.push(*hash),
            }
        }

        if !rejected.is_empty() {
            BatchOutcome::AnyRejected { committed, rejected }
        } else if pending.is_empty() {
            BatchOutcome::AllCommitted
        } else {
            BatchOutcome::Partial { committed, pending }
        }
    }
}

/// Follow every member's status stream to its terminal status
///
/// Streams are consumed concurrently. A stream that closes before a terminal
/// status leaves its member pending; any other failure is returned.
pub async fn track<T: Transport + ?Sized>(transport: &T, hashes: &[TxHash]) -> Result<BatchTracker> {
    let mut tracker = BatchTracker::new(hashes.to_vec());

    let waits = hashes.iter().map(|hash| async move {
        let stream = transport.stream_status(hash).await?;
        stream.wait_terminal().await
    });

    for result in join_all(waits).await {
        match result {
            Ok(response) => {
                tracker.record(&response);
            }
            Err(Error::StreamClosed(hash)) => {
                warn!("Status stream for {} closed without a terminal status", hash);
            }
            Err(e) => return Err(e),
        }
    }

    info!("Tracked {} transactions: {:?}", hashes.len(), tracker.outcome());
    Ok(tracker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes() {
        let a = TxHash([1u8; 32]);
        let b = TxHash([2u8; 32]);
        let mut tracker = BatchTracker::new(vec![a, b]);
        assert_eq!(
            tracker.outcome(),
            BatchOutcome::Partial {
                committed: vec![],
                pending: vec![a, b]
            }
        );

        assert!(tracker.record(&ToriiResponse::new(&a, TxStatus::Committed)));
        assert!(!tracker.record(&ToriiResponse::new(&a, TxStatus::Committed)));
        assert!(!tracker.record(&ToriiResponse::new(&b, TxStatus::MstPending)));
        assert!(!tracker.is_settled());

        assert!(tracker.record(&ToriiResponse::new(&b, TxStatus::Committed)));
        assert!(tracker.is_settled());
        assert!(tracker.outcome().is_all_committed());
    }

    #[test]
    fn test_any_rejected_keeps_reason() {
        let a = TxHash([1u8; 32]);
        let b = TxHash([2u8; 32]);
        let mut tracker = BatchTracker::new(vec![a, b]);
        tracker.record(&ToriiResponse::new(&a, TxStatus::Committed));
        tracker.record(&ToriiResponse::new(&b, TxStatus::Rejected).with_error("bad signatory"));

        match tracker.outcome() {
            BatchOutcome::AnyRejected { committed, rejected } => {
                assert_eq!(committed, vec![a]);
                assert_eq!(rejected.len(), 1);
                assert_eq!(rejected[0].status, TxStatus::Rejected);
                assert_eq!(rejected[0].reason, "bad signatory");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_foreign_hash_ignored() {
        let a = TxHash([1u8; 32]);
        let mut tracker = BatchTracker::new(vec![a]);
        assert!(!tracker.record(&ToriiResponse::new(&TxHash([9u8; 32]), TxStatus::Committed)));
        assert_eq!(tracker.status(&a), None);
    }
}
