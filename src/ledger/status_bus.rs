//! Status bus of the sandbox engine
//!
//! Keeps the latest status of every transaction and broadcasts each update.
//! Updates are monotonic: a status of lower rank than the current one, or
//! any change after a terminal status, is dropped.

use crate::error::Result;
use crate::status::StatusStream;
use crate::types::{ToriiResponse, TxHash, TxStatus};
use futures::{stream, StreamExt};
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

const STATUS_CHANNEL_CAPACITY: usize = 1024;

pub struct StatusBus {
    latest: RwLock<HashMap<TxHash, ToriiResponse>>,
    sender: broadcast::Sender<ToriiResponse>,
}

impl StatusBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        Self {
            latest: RwLock::new(HashMap::new()),
            sender,
        }
    }

    /// Record and broadcast a status update
    ///
    /// # Returns
    /// `false` if the update was dropped (regression, repeat, or after a
    /// terminal status)
    pub async fn publish(&self, response: ToriiResponse) -> bool {
        let Some(hash) = response.hash() else {
            warn!("Dropping status update with malformed hash '{}'", response.tx_hash);
            return false;
        };

        let mut latest = self.latest.write().await;
        if let Some(current) = latest.get(&hash) {
            let (from, to) = (current.status(), response.status());
            if from.is_terminal() {
                if from != to {
                    warn!("Ignoring {} for {}: already {}", to, hash, from);
                }
                return false;
            }
            if to.rank() < from.rank() || *current == response {
                debug!("Ignoring {} for {}: currently {}", to, hash, from);
                return false;
            }
        }

        debug!("Status {} for {}", response.status(), hash);
        latest.insert(hash, response.clone());
        // Sent under the write lock so subscribers see updates in map order
        let _ = self.sender.send(response);
        true
    }

    /// Latest status, `NOT_RECEIVED` for unknown transactions
    pub async fn get(&self, hash: &TxHash) -> ToriiResponse {
        self.latest
            .read()
            .await
            .get(hash)
            .cloned()
            .unwrap_or_else(|| ToriiResponse::new(hash, TxStatus::NotReceived))
    }

    /// Stream of updates for one transaction, starting with its current status
    pub async fn subscribe(&self, hash: TxHash) -> StatusStream {
        // Subscribe before taking the snapshot so no update falls in between
        let receiver = self.sender.subscribe();
        let current = self.get(&hash).await;

        let updates = BroadcastStream::new(receiver).filter_map(move |item| {
            let relevant: Option<Result<ToriiResponse>> = match item {
                Ok(response) if response.hash() == Some(hash) => Some(Ok(response)),
                Ok(_) => None,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Status subscriber for {} lagged by {} updates", hash, skipped);
                    None
                }
            };
            futures::future::ready(relevant)
        });

        let snapshot: Result<ToriiResponse> = Ok(current);
        StatusStream::new(hash, stream::iter([snapshot]).chain(updates))
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_hash_is_not_received() {
        let bus = StatusBus::new();
        let hash = TxHash([1u8; 32]);
        assert_eq!(bus.get(&hash).await.status(), TxStatus::NotReceived);
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let bus = StatusBus::new();
        let hash = TxHash([2u8; 32]);
        assert!(bus.publish(ToriiResponse::new(&hash, TxStatus::MstPending)).await);
        assert!(!bus.publish(ToriiResponse::new(&hash, TxStatus::StatelessValidationSuccess)).await);
        assert!(bus.publish(ToriiResponse::new(&hash, TxStatus::MstExpired)).await);
        assert!(!bus.publish(ToriiResponse::new(&hash, TxStatus::Committed)).await);
        assert_eq!(bus.get(&hash).await.status(), TxStatus::MstExpired);
    }

    #[tokio::test]
    async fn test_subscription_sees_snapshot_then_updates() {
        let bus = StatusBus::new();
        let hash = TxHash([3u8; 32]);
        let other = TxHash([4u8; 32]);
        bus.publish(ToriiResponse::new(&hash, TxStatus::StatelessValidationSuccess))
            .await;

        let stream = bus.subscribe(hash).await;
        bus.publish(ToriiResponse::new(&other, TxStatus::Committed)).await;
        bus.publish(ToriiResponse::new(&hash, TxStatus::MstPending)).await;
        bus.publish(ToriiResponse::new(&hash, TxStatus::Committed)).await;

        assert_eq!(
            stream.statuses().await.unwrap(),
            vec![
                TxStatus::StatelessValidationSuccess,
                TxStatus::MstPending,
                TxStatus::Committed
            ]
        );
    }
}
