use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use strand_persist::CreateThreadArgs;
use strand_types::{Page, Thread, ThreadPatch};

use crate::{error::ApiResult, routes::pagination, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListThreadsQuery {
    pub num_items: Option<usize>,
    pub cursor: Option<String>,
}

/// Create a new thread
pub async fn create_thread(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateThreadArgs>,
) -> ApiResult<(StatusCode, Json<Thread>)> {
    let thread = state.persist.ledger().create_thread(req).await?;
    Ok((StatusCode::CREATED, Json(thread)))
}

/// Get a specific thread by ID
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<Thread>> {
    let thread = state.persist.ledger().get_thread_metadata(&thread_id).await?;
    Ok(Json(thread))
}

/// Update title, summary or status
pub async fn update_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(patch): Json<ThreadPatch>,
) -> ApiResult<Json<Thread>> {
    let thread = state.persist.ledger().update_thread(&thread_id, patch).await?;
    Ok(Json(thread))
}

/// Delete a thread with its messages and streams
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.persist.delete_thread(&thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List a user's threads, newest first
pub async fn list_user_threads(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListThreadsQuery>,
) -> ApiResult<Json<Page<Thread>>> {
    let opts = pagination(
        query.num_items,
        query.cursor,
        state.config.ledger.default_page_size,
    );
    let page = state.persist.ledger().list_threads_by_user(&user_id, opts).await?;
    Ok(Json(page))
}
