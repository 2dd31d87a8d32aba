//! Size-capped, deadline-bound body relay.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use tokio::time::{sleep_until, Instant, Sleep};

use crate::observability::metrics;
use crate::upstream::types::ProxyError;

/// Per-response relay counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayState {
    pub bytes_forwarded: u64,
    pub limit_exceeded: bool,
}

/// Stream adapter between the upstream body and the client.
///
/// The upstream is polled only from `poll_next`, i.e. only when the consumer
/// asks for the next chunk. While the consumer is not ready nothing is read,
/// so the socket's receive window fills and the peer is throttled. At most
/// one chunk is in flight at any time.
///
/// A chunk that would push the total past the limit is never yielded: the
/// relay returns [`ProxyError::BodyTooLarge`] and drops the upstream, closing
/// its connection. Every later poll returns `None`.
pub struct BoundedRelay {
    upstream: Option<BoxStream<'static, Result<Bytes, ProxyError>>>,
    deadline: Pin<Box<Sleep>>,
    limit: u64,
    state: RelayState,
    abort_reason: Option<&'static str>,
}

impl BoundedRelay {
    pub fn new<S, E>(upstream: S, limit: u64, deadline: Instant) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: std::fmt::Display + 'static,
    {
        let upstream = upstream
            .map(|chunk| chunk.map_err(|e| ProxyError::Transport(e.to_string())))
            .boxed();
        Self {
            upstream: Some(upstream),
            deadline: Box::pin(sleep_until(deadline)),
            limit,
            state: RelayState::default(),
            abort_reason: None,
        }
    }

    /// Relay the body of a validated upstream response.
    pub fn from_response(response: reqwest::Response, limit: u64, deadline: Instant) -> Self {
        Self::new(response.bytes_stream(), limit, deadline)
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    fn abort(&mut self, reason: &'static str, err: ProxyError) -> Poll<Option<Result<Bytes, ProxyError>>> {
        self.upstream = None;
        self.abort_reason = Some(reason);
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for BoundedRelay {
    type Item = Result<Bytes, ProxyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.upstream.is_none() {
            return Poll::Ready(None);
        }

        if this.deadline.as_mut().poll(cx).is_ready() {
            return this.abort("timeout", ProxyError::Timeout);
        }

        let polled = match this.upstream.as_mut() {
            Some(upstream) => upstream.poll_next_unpin(cx),
            None => return Poll::Ready(None),
        };

        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.upstream = None;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => this.abort("upstream_error", e),
            Poll::Ready(Some(Ok(chunk))) => {
                let total = this.state.bytes_forwarded + chunk.len() as u64;
                if total > this.limit {
                    this.state.limit_exceeded = true;
                    let limit = this.limit;
                    return this.abort("size_limit", ProxyError::BodyTooLarge { limit });
                }
                this.state.bytes_forwarded = total;
                Poll::Ready(Some(Ok(chunk)))
            }
        }
    }
}

impl Drop for BoundedRelay {
    fn drop(&mut self) {
        // Dropped mid-stream without an error means the client went away.
        let reason = self
            .abort_reason
            .or_else(|| self.upstream.as_ref().map(|_| "client_gone"));
        metrics::record_relay(self.state.bytes_forwarded, reason);
        tracing::debug!(
            bytes = self.state.bytes_forwarded,
            limit_exceeded = self.state.limit_exceeded,
            aborted = ?reason,
            "Relay finished"
        );
    }
}
