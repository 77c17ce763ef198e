//! Server-Sent Events (SSE) handler.
//!
//! Subscribes to the [`vm_core::events::EventBus`], optionally narrows the
//! stream to one batch operation, replays recent events for late joiners,
//! and sends keepalive heartbeats.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use vm_core::events::{EventPayload, TaskKind};

use crate::context::AppContext;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only forward events of this operation, e.g. `merge_movies`.
    pub task: Option<TaskKind>,
}

/// GET /api/events -- SSE stream of task and item events.
pub async fn events_handler(
    State(ctx): State<AppContext>,
    Query(params): Query<EventsQuery>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let filter = params.task;

    let recent = ctx.event_bus.recent_events(50);
    let mut rx = ctx.event_bus.subscribe();

    let stream = async_stream::stream! {
        for event in recent.into_iter().rev() {
            if matches_task(&event.payload, filter) {
                if let Ok(data) = serde_json::to_string(&event) {
                    yield Ok(Event::default().data(data));
                }
            }
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(15));

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            if matches_task(&event.payload, filter) {
                                if let Ok(data) = serde_json::to_string(&event) {
                                    yield Ok(Event::default().data(data));
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!("SSE client lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default()
                        .event("heartbeat")
                        .data(r#"{"type":"heartbeat"}"#));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn matches_task(payload: &EventPayload, filter: Option<TaskKind>) -> bool {
    let Some(wanted) = filter else {
        return true;
    };
    match payload {
        EventPayload::TaskStarted { task }
        | EventPayload::TaskProgress { task, .. }
        | EventPayload::TaskCompleted { task, .. }
        | EventPayload::TaskFailed { task, .. } => *task == wanted,
        EventPayload::ItemUpdated { .. } => false,
    }
}
