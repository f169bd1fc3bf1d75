use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use strand_types::{Cursor, DeltaBatch, StreamMessage, StreamStatus};

use crate::{error::ApiResult, routes::parse_list, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListStreamsQuery {
    /// Comma-separated, e.g. `streaming`; all statuses when omitted
    pub statuses: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CursorQuery {
    pub cursor: Option<u64>,
}

fn parse_status(raw: &str) -> Option<StreamStatus> {
    match raw {
        "streaming" => Some(StreamStatus::Streaming),
        "finished" => Some(StreamStatus::Finished),
        "aborted" => Some(StreamStatus::Aborted),
        _ => None,
    }
}

/// Streams of a thread
pub async fn list_streams(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Query(query): Query<ListStreamsQuery>,
) -> ApiResult<Json<Vec<StreamMessage>>> {
    let statuses = parse_list(query.statuses.as_deref(), parse_status)?;
    let streams = state
        .persist
        .deltas()
        .list_streams(&thread_id, &statuses)
        .await?;
    Ok(Json(streams))
}

/// Deltas of one stream after `cursor`
pub async fn read_deltas(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
    Query(query): Query<CursorQuery>,
) -> ApiResult<Json<DeltaBatch>> {
    let batch = state
        .persist
        .deltas()
        .read_deltas(&stream_id, query.cursor.map(Cursor))
        .await?;
    Ok(Json(batch))
}

/// Tail a stream using Server-Sent Events
///
/// Emits a `deltas` event per new batch and a final `end` event carrying the
/// terminal status.
pub async fn tail_stream(
    State(state): State<Arc<AppState>>,
    Path(stream_id): Path<String>,
    Query(query): Query<CursorQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let batches = state
        .persist
        .deltas()
        .tail(&stream_id, query.cursor.map(Cursor));

    let events = batches.map(move |item| {
        let event = match item {
            Ok(batch) => {
                let name = if batch.status.is_terminal() { "end" } else { "deltas" };
                Event::default().event(name).json_data(&batch).unwrap_or_else(|e| {
                    tracing::error!("Failed to encode delta batch: {}", e);
                    Event::default().event("error").data("encoding failed")
                })
            }
            Err(e) => {
                tracing::error!("Stream tail failed: {}", e);
                Event::default().event("error").data(e.to_string())
            }
        };
        Ok::<Event, Infallible>(event)
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
