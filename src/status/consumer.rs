//! Status stream relay with terminal detection

use crate::error::{Error, Result};
use crate::types::{ToriiResponse, TxHash, TxStatus};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, warn};

/// Boxed source of status observations
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<ToriiResponse>> + Send>>;

/// Status observations for one transaction
///
/// Relays statuses from the source unchanged and ends right after the first
/// terminal status, even when the source keeps producing. An error item
/// also ends the stream. Dropping the stream cancels the subscription only.
pub struct StatusStream {
    hash: TxHash,
    inner: ResponseStream,
    last_rank: Option<u8>,
    done: bool,
}

impl StatusStream {
    pub fn new<S>(hash: TxHash, source: S) -> Self
    where
        S: Stream<Item = Result<ToriiResponse>> + Send + 'static,
    {
        Self {
            hash,
            inner: Box::pin(source),
            last_rank: None,
            done: false,
        }
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Drain the stream up to its terminal status
    ///
    /// # Returns
    /// * `Ok(ToriiResponse)` carrying the terminal status
    /// * `Err(Error::StreamClosed)` if the source ended first
    /// * any error the source produced
    pub async fn wait_terminal(mut self) -> Result<ToriiResponse> {
        while let Some(item) = self.next().await {
            let response = item?;
            if response.status().is_terminal() {
                return Ok(response);
            }
        }
        Err(Error::StreamClosed(self.hash))
    }

    /// Collect every relayed status, in order
    pub async fn statuses(self) -> Result<Vec<TxStatus>> {
        let responses: Vec<Result<ToriiResponse>> = self.collect().await;
        responses
            .into_iter()
            .map(|item| item.map(|r| r.status()))
            .collect()
    }
}

impl Stream for StatusStream {
    type Item = Result<ToriiResponse>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(response))) => {
                let status = response.status();
                let rank = status.rank();
                if let Some(last) = self.last_rank {
                    if rank < last {
                        warn!(
                            "Status regression for {}: rank {} after rank {} ({})",
                            self.hash, rank, last, status
                        );
                    }
                }
                self.last_rank = Some(rank);
                if status.is_terminal() {
                    debug!("Terminal status {} for {}", status, self.hash);
                    self.done = true;
                }
                Poll::Ready(Some(Ok(response)))
            }
            Poll::Ready(Some(Err(e))) => {
                self.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
