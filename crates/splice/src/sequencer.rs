// File: src/sequencer.rs
// Purpose: FIFO mailbox serializing response application onto the context

use anyhow::Result;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::request::{RawResponse, RequestDescriptor};
use crate::router::VisitOutcome;

/// A completed network exchange awaiting sequenced processing. Lives only
/// inside the mailbox; consumed exactly once.
pub struct SettledResponse {
    pub request: RequestDescriptor,
    pub response: RawResponse,

    /// Resolves the originating visit future with the handler's result.
    pub resolve: oneshot::Sender<Result<VisitOutcome>>,
}

pub(crate) type ProcessFn = Arc<
    dyn Fn(RequestDescriptor, RawResponse) -> BoxFuture<'static, Result<VisitOutcome>>
        + Send
        + Sync,
>;

/// Single-worker mailbox: responses are applied strictly in enqueue order,
/// which is settlement order, not request-issue order. A slow earlier-issued
/// response that settles late is applied late; that is the contract, not a
/// bug. The worker owns exclusive context-mutation rights, so two responses
/// can never interleave their writes.
pub struct ResponseSequencer {
    tx: mpsc::UnboundedSender<SettledResponse>,
}

impl ResponseSequencer {
    /// Spawn the drain worker. The worker stops once every sender is gone.
    pub(crate) fn new(process: ProcessFn) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SettledResponse>();

        tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                tracing::debug!(url = %item.request.url, "draining settled response");
                let outcome = process(item.request, item.response).await;
                // The caller may have stopped awaiting; that is fine.
                let _ = item.resolve.send(outcome);
            }
        });

        Self { tx }
    }

    /// Append a settled response. Once enqueued it always runs to completion,
    /// including every hook dispatch; cancellation can no longer reach it.
    pub fn enqueue(&self, item: SettledResponse) {
        if self.tx.send(item).is_err() {
            tracing::warn!("response sequencer worker is gone; dropping settled response");
        }
    }
}
