//! Gateway event broadcaster for the `/_vigil/events` stream.
//!
//! Implements the core [`GatewayEventEmitter`] port on top of a tokio
//! broadcast channel, so every connected client sees every event.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use vigil_core::{GatewayEvent, GatewayEventEmitter};

/// Broadcasts [`GatewayEvent`]s to SSE subscribers.
///
/// Slow subscribers that fall more than `capacity` events behind skip the
/// events they missed.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<GatewayEvent>,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcaster with room for 256 pending events.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(256)
    }

    /// Receiver for in-process listeners.
    pub fn receiver(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// SSE response streaming every future event as JSON, with a
    /// keep-alive ping every 30 seconds.
    pub fn subscribe(
        self: Arc<Self>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        let stream = BroadcastStream::new(self.sender.subscribe()).filter_map(|result| match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(e) => {
                    tracing::warn!("Failed to serialize gateway event: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::debug!("Event subscriber lagged: {e}");
                None
            }
        });

        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("ping"),
        )
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl GatewayEventEmitter for EventBroadcaster {
    fn emit(&self, event: GatewayEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}
