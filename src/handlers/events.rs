//! Server-sent event stream of ingested records

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};

use crate::context::AppContext;
use crate::models::LiveEvent;

/// GET /events - Push every ingested event as `{topic, message}`
///
/// The observer is attached for exactly as long as the response stream lives;
/// when the client disconnects axum drops the stream, which detaches it.
pub async fn stream_events(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = ctx.hub.subscribe();

    let events = stream::unfold(subscription, |mut subscription| async move {
        let event = subscription.recv().await?;
        Some((Ok(to_sse_event(&event)), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn to_sse_event(event: &LiveEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(json) => Event::default().data(json),
        Err(e) => {
            tracing::warn!(topic = %event.topic, error = %e, "Failed to serialize live event");
            Event::default().comment("unserializable event")
        }
    }
}
