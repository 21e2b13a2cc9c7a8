//! # Background Dispatch
//!
//! Hands events to a sink from a background task so that reporting a
//! failure never waits on the backend. The channel is bounded; when it is
//! full the event is refused and the caller decides what to log.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sink::{OutboundEvent, ReportSink, SinkOptions};
use crate::types::SinkError;

/// Sink adapter that queues events for a background worker
#[derive(Clone)]
pub struct ChannelSink {
    inner: Arc<dyn ReportSink>,
    sender: mpsc::Sender<OutboundEvent>,
}

impl std::fmt::Debug for ChannelSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSink")
            .field("capacity", &self.sender.max_capacity())
            .finish_non_exhaustive()
    }
}

impl ChannelSink {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// The worker exits once every `ChannelSink` clone has been dropped and
    /// the queue is drained.
    pub fn spawn(inner: Arc<dyn ReportSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(Self::run_worker(receiver, Arc::clone(&inner)));
        (Self { inner, sender }, handle)
    }

    async fn run_worker(mut receiver: mpsc::Receiver<OutboundEvent>, sink: Arc<dyn ReportSink>) {
        while let Some(event) = receiver.recv().await {
            let event_id = event.event_id;
            if let Err(e) = sink.capture(event) {
                tracing::error!(%event_id, error = %e, "Failed to deliver error report");
            }
        }
        tracing::debug!("Error report dispatcher stopped");
    }
}

impl ReportSink for ChannelSink {
    fn init(&self, options: SinkOptions) -> Result<(), SinkError> {
        self.inner.init(options)
    }

    fn capture(&self, event: OutboundEvent) -> Result<(), SinkError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Rejected("dispatch channel full".to_string()),
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}
