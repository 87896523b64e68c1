//! Pending-State Reconciler
//!
//! Drives the counterparty side of a multi-signature batch:
//! observe the engine's pending set, accept or decline it, send every batch
//! back in full, and follow the members to their outcome.
//!
//! # Transitions
//! - observe: Unseen/Observed/Accepted/Declined/Resubmitted -> Observed
//! - accept: Observed -> Accepted
//! - decline: Observed -> Declined
//! - resubmit: Accepted/Declined -> Resubmitted
//! - await_outcome: Resubmitted -> Committed/Rejected (unsettled members stay Resubmitted)

use super::state::ReconcileState;
use crate::batch::{BatchSequence, TxBatch};
use crate::client::Client;
use crate::crypto::PrivateKey;
use crate::error::{Error, Result};
use crate::signing;
use crate::status::{track, BatchOutcome};
use crate::transport::Transport;
use crate::types::{Transaction, TxHash};
use std::collections::HashMap;
use tracing::{debug, info, info_span, Instrument};

/// One batch of the pending set
pub type PendingBatch = TxBatch;

/// Snapshot of the pending set, grouped into batches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingView {
    pub batches: Vec<PendingBatch>,
}

impl PendingView {
    pub fn hashes(&self) -> Vec<TxHash> {
        self.transactions().map(Transaction::hash).collect()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.batches.iter().flat_map(|b| b.transactions.iter())
    }

    fn transactions_mut(&mut self) -> impl Iterator<Item = &mut Transaction> {
        self.batches.iter_mut().flat_map(|b| b.transactions.iter_mut())
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// What to do with signatures on transactions created by other accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForeignSignatures {
    /// Send them back unsigned; the engine keeps what it already collected
    #[default]
    Strip,
    /// Replace them with this party's signatures (delegated signing)
    Replace,
}

pub struct PendingReconciler<'a, T: Transport> {
    client: &'a Client<T>,
    states: HashMap<TxHash, ReconcileState>,
}

impl<'a, T: Transport> PendingReconciler<'a, T> {
    pub fn new(client: &'a Client<T>) -> Self {
        Self {
            client,
            states: HashMap::new(),
        }
    }

    pub fn state(&self, hash: &TxHash) -> ReconcileState {
        self.states.get(hash).copied().unwrap_or_default()
    }

    /// Move every hash to `to`, or none of them if any is in a state not in `from`
    fn advance(
        &mut self,
        hashes: &[TxHash],
        from: &[ReconcileState],
        to: ReconcileState,
    ) -> Result<()> {
        for hash in hashes {
            let current = self.state(hash);
            if !from.contains(&current) {
                return Err(Error::IllegalTransition {
                    hash: *hash,
                    from: current.name(),
                    to: to.name(),
                });
            }
        }
        for hash in hashes {
            self.states.insert(*hash, to);
        }
        Ok(())
    }

    /// Fetch the pending set of this party
    pub async fn observe(&mut self) -> Result<PendingView> {
        let span = info_span!("observe", party = %self.client.account_id());
        let transactions = self
            .client
            .pending_transactions()
            .instrument(span.clone())
            .await?;

        let view = PendingView {
            batches: BatchSequence::split(transactions),
        };
        self.advance(
            &view.hashes(),
            &[
                ReconcileState::Unseen,
                ReconcileState::Observed,
                ReconcileState::Accepted,
                ReconcileState::Declined,
                ReconcileState::Resubmitted,
            ],
            ReconcileState::Observed,
        )?;

        span.in_scope(|| {
            info!(
                "Observed {} pending batches ({} transactions)",
                view.batches.len(),
                view.transactions().count()
            )
        });
        Ok(view)
    }

    /// Sign the pending set
    ///
    /// Own transactions keep their signatures and get this party's appended.
    /// Foreign ones are handled per `foreign`.
    pub fn accept(&mut self, view: &mut PendingView, foreign: ForeignSignatures) -> Result<()> {
        let _span = info_span!("accept", party = %self.client.account_id()).entered();
        self.advance(
            &view.hashes(),
            &[ReconcileState::Observed],
            ReconcileState::Accepted,
        )?;

        let me = self.client.account_id();
        for tx in view.transactions_mut() {
            if tx.creator_account_id() == me {
                self.client.sign(tx);
            } else {
                tx.signatures.clear();
                if foreign == ForeignSignatures::Replace {
                    self.client.sign(tx);
                }
            }
            debug!("Accepted {} with {} signatures", tx.hash(), tx.signatures.len());
        }
        Ok(())
    }

    /// Prepare the pending set so that it fails downstream
    ///
    /// Foreign transactions are stripped and own ones are signed with
    /// `wrong_keys`. Nothing is rejected locally; the engine decides.
    pub fn decline(&mut self, view: &mut PendingView, wrong_keys: &[PrivateKey]) -> Result<()> {
        let _span = info_span!("decline", party = %self.client.account_id()).entered();
        self.advance(
            &view.hashes(),
            &[ReconcileState::Observed],
            ReconcileState::Declined,
        )?;

        let me = self.client.account_id();
        for tx in view.transactions_mut() {
            if tx.creator_account_id() == me {
                signing::sign_with_all(tx, wrong_keys);
            } else {
                tx.signatures.clear();
            }
        }
        info!("Declined {} transactions", view.transactions().count());
        Ok(())
    }

    /// Send every batch of the view back to the engine, all members at once
    ///
    /// # Returns
    /// Hashes of the resubmitted transactions
    pub async fn resubmit(&mut self, view: PendingView) -> Result<Vec<TxHash>> {
        let hashes = view.hashes();
        for hash in &hashes {
            let current = self.state(hash);
            if !matches!(current, ReconcileState::Accepted | ReconcileState::Declined) {
                return Err(Error::IllegalTransition {
                    hash: *hash,
                    from: current.name(),
                    to: ReconcileState::Resubmitted.name(),
                });
            }
        }

        let span = info_span!("resubmit", party = %self.client.account_id());
        for batch in view.batches {
            let members = batch.hashes();
            self.client
                .send_batch(batch.into_transactions())
                .instrument(span.clone())
                .await?;
            for hash in members {
                self.states.insert(hash, ReconcileState::Resubmitted);
            }
        }
        Ok(hashes)
    }

    /// Follow resubmitted transactions to their terminal statuses
    pub async fn await_outcome(&mut self, hashes: &[TxHash]) -> Result<BatchOutcome> {
        for hash in hashes {
            let current = self.state(hash);
            if current != ReconcileState::Resubmitted {
                return Err(Error::IllegalTransition {
                    hash: *hash,
                    from: current.name(),
                    to: "Committed|Rejected",
                });
            }
        }

        let span = info_span!("await_outcome", party = %self.client.account_id());
        let tracker = track(self.client.transport(), hashes)
            .instrument(span)
            .await?;

        for hash in hashes {
            match tracker.status(hash) {
                Some(status) if status.is_committed() => {
                    self.states.insert(*hash, ReconcileState::Committed);
                }
                Some(_) => {
                    self.states.insert(*hash, ReconcileState::Rejected);
                }
                None => {}
            }
        }

        let outcome = tracker.outcome();
        info!("Outcome for {} transactions: {:?}", hashes.len(), outcome);
        Ok(outcome)
    }
}
