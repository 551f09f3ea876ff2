//! Server-Sent Events endpoint
//!
//! Streams real-time catalog events to connected clients.

use crate::api::server::AppContext;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use tracing::debug;

/// GET /api/events - SSE event stream
///
/// Each event carries the `CatalogEvent` type in the `event:` field and its
/// JSON body in `data:`. Keep-alive comment frames are sent periodically and
/// carry no payload.
pub async fn event_stream(
    State(ctx): State<AppContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE client connected");
    ctx.broadcaster.handle_sse_connection()
}
