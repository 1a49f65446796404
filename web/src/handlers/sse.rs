//! Server-sent event stream.
//!
//! ```text
//! Client            SSE handler              SubscriptionHub
//!   │                    │                          │
//!   ├─ GET /sse ────────>├─ subscribe() ───────────>│
//!   │                    │<──── ChangeEvent ────────┤
//!   │<─ data: {...} ─────┤                          │
//!   │                    │                          │
//!   ├─ disconnect ──────>│ (stream dropped) ───────>│ unsubscribe
//! ```
//!
//! Each frame carries `{"event": "time" | "isStock", "data": "<payload>"}` as
//! its data line. Keep-alive comments are sent between ticks.

use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{future, Stream, StreamExt};
use std::convert::Infallible;
use stockwatch_core::ChangeEvent;

/// Subscribe to stock and time events.
///
/// The subscription lives as long as the response stream; when the client
/// disconnects Axum drops the stream, which unsubscribes it from the hub.
///
/// # Endpoint
///
/// ```text
/// GET /sse
/// ```
#[allow(clippy::unused_async)]
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.hub.subscribe();
    tracing::debug!(subscriber = %subscription.id(), "SSE stream opened");

    let stream = subscription.filter_map(|event| future::ready(frame(&event).map(Ok)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.keep_alive)
            .text("keepalive"),
    )
}

/// Encode one event as an SSE frame; unencodable events are skipped.
fn frame(event: &ChangeEvent) -> Option<Event> {
    match event.to_json() {
        Ok(json) => Some(Event::default().data(json)),
        Err(error) => {
            tracing::warn!(error = %error, "Dropping unencodable event");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use std::sync::Arc;
    use std::time::Duration;
    use stockwatch_core::ItemId;
    use stockwatch_runtime::{HubConfig, SubscriptionHub};
    use stockwatch_testing::InMemoryStockStore;

    fn state(hub: &SubscriptionHub) -> AppState {
        let store = InMemoryStockStore::with_item(ItemId::new(1), "Product X", 3);
        AppState::for_store(Arc::new(store), ItemId::new(1), hub.clone())
    }

    #[tokio::test]
    async fn stream_carries_json_frames() {
        let hub = SubscriptionHub::new(HubConfig::default());
        let response = stream_events(State(state(&hub))).await.into_response();
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(hub.subscriber_count(), 1);

        hub.broadcast(&ChangeEvent::stock("In stock: 3")).await;

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(1), body.next())
            .await
            .expect("frame")
            .unwrap()
            .unwrap();
        let text = String::from_utf8_lossy(&chunk);
        assert!(
            text.contains(r#"data: {"event":"isStock","data":"In stock: 3"}"#),
            "unexpected frame: {text}"
        );
    }

    #[tokio::test]
    async fn dropping_the_response_unsubscribes() {
        let hub = SubscriptionHub::new(HubConfig::default());
        let response = stream_events(State(state(&hub))).await.into_response();
        assert_eq!(hub.subscriber_count(), 1);

        drop(response);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
