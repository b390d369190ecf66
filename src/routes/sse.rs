use crate::state::GateState;
use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::Stream;
use std::convert::Infallible;
use tokio_stream::StreamExt;

/// Pages connect here and re-fetch their fragments on `sse:requests` / `sse:registry`.
pub async fn sse_feed(
    State(state): State<GateState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state
        .subscribe()
        .into_stream()
        .map(|event| Ok(Event::default().event(event.event_name()).data("changed")));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
