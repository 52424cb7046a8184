use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{self, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use api::event::Event;
use api::response::Announcement;

use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::EVENTS, get(events))
        .route(api::path::ANNOUNCEMENTS, get(announcements))
}

async fn announcements(State(state): State<AppState>) -> Json<Vec<Announcement>> {
    Json(state.feed.posts())
}

/// Event stream, ends when the server shuts down so graceful shutdown is not held open
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<sse::Event, Infallible>>> {
    info!("event stream client connected");
    let closing = WatchStream::new(state.closing.clone())
        .filter(|closing| *closing)
        .map(|_| None);
    let stream = BroadcastStream::new(state.scheduler.subscribe())
        .filter_map(|result| match result {
            Ok(event) => Some(Some(event)),
            Err(e) => {
                debug!("event stream lagging: {}", e);
                None
            }
        })
        .merge(closing)
        .take_while(Option::is_some)
        .filter_map(|event: Option<Event>| {
            let event = event?;
            match sse::Event::default().event(event.name()).json_data(&event) {
                Ok(sse_event) => Some(Ok(sse_event)),
                Err(e) => {
                    debug!(?e, "event not encoded");
                    None
                }
            }
        });
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
