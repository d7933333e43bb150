/// Server-sent change feed
///
/// Streams the caller's own change events as SSE, replacing poll loops in
/// clients that want live updates. Every successful mutation elsewhere in
/// the API publishes onto the in-process broadcast hub; this endpoint
/// filters that firehose down to the authenticated user (and optionally one
/// entity collection) and frames each event as an SSE `change` message.
///
/// A consumer too slow to keep up falls off the bounded broadcast channel;
/// the stream then ends and the client is expected to reconnect and
/// re-fetch. Publishers never block on slow consumers.
///
/// # Endpoint
///
/// ```text
/// GET /v1/events?entity=tasks
/// Accept: text/event-stream
/// ```
///
/// ```text
/// event: change
/// data: {"user_id":"...","entity":"tasks","action":"created","id":"...","at":"..."}
/// ```

use std::{convert::Infallible, time::Duration};

use crate::app::AppState;
use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures::stream::Stream;
use serde::Deserialize;
use taskflow_shared::{auth::middleware::AuthContext, events::EntityKind};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

/// Interval between keep-alive comments
const KEEP_ALIVE_SECS: u64 = 25;

/// Change feed query
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Restrict the feed to one entity collection
    pub entity: Option<EntityKind>,
}

/// Stream the caller's change events
pub async fn stream_events(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<EventsQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.events.subscribe();
    let user_id = auth.user_id;
    let entity = query.entity;

    let stream = BroadcastStream::new(receiver)
        // A lag error means this consumer lost events; end the stream so the
        // client reconnects with fresh state instead of silently missing data
        .take_while(|result| result.is_ok())
        .filter_map(move |result| {
            let change = result.ok()?;

            if change.user_id != user_id {
                return None;
            }
            if entity.is_some_and(|wanted| change.entity != wanted) {
                return None;
            }

            let event = Event::default().event("change").json_data(&change).ok()?;
            Some(Ok::<_, Infallible>(event))
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}
