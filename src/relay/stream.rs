use std::convert::Infallible;

use axum::{
    debug_handler,
    extract::State,
    response::sse::{Event as SseEvent, Sse},
};
use futures_util::{Stream, stream};
use tokio::sync::mpsc;

use super::{Relay, event::ConnectionId};

/// Deregisters the connection once the response stream is dropped.
struct DisconnectGuard {
    relay: Relay,
    id: ConnectionId,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let relay = self.relay.clone();
        let id = self.id.clone();
        handle.spawn(async move {
            relay.disconnect(&id).await;
        });
    }
}

/// Turns a connection's channel into SSE frames, one `data:` line per event.
pub fn event_stream(
    relay: Relay,
    id: ConnectionId,
    rx: mpsc::Receiver<String>,
) -> impl Stream<Item = Result<SseEvent, Infallible>> + Send + 'static {
    let guard = DisconnectGuard { relay, id };
    stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let frame = rx.recv().await?;
        Some((Ok(SseEvent::default().data(frame)), (rx, guard)))
    })
}

#[debug_handler(state = crate::AppState)]
pub async fn connect(
    State(relay): State<Relay>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (id, rx) = relay.connect().await;
    Sse::new(event_stream(relay, id, rx))
}
