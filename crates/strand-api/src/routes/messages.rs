use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use strand_persist::{
    FinalizeMessage, ListMessagesArgs, MessageInput, SaveMessagesOptions, SaveMessagesResult,
};
use strand_types::{MessageDoc, MessageStatus, Page, SortOrder};

use crate::{
    error::{ApiError, ApiResult},
    routes::{pagination, parse_list},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub num_items: Option<usize>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub order: SortOrder,
    /// Comma-separated, e.g. `success,failed`
    pub statuses: Option<String>,
    #[serde(default)]
    pub exclude_tool_messages: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveMessagesRequest {
    pub messages: Vec<MessageInput>,
    #[serde(flatten)]
    pub options: SaveMessagesOptions,
}

fn parse_status(raw: &str) -> Option<MessageStatus> {
    match raw {
        "pending" => Some(MessageStatus::Pending),
        "success" => Some(MessageStatus::Success),
        "failed" => Some(MessageStatus::Failed),
        _ => None,
    }
}

/// List messages in a thread
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<Page<MessageDoc>>> {
    let ledger = state.persist.ledger();
    ledger.get_thread_metadata(&thread_id).await?;

    let statuses = parse_list(query.statuses.as_deref(), parse_status)?;
    let args = ListMessagesArgs {
        pagination: pagination(
            query.num_items,
            query.cursor,
            state.config.ledger.default_page_size,
        ),
        statuses: (!statuses.is_empty()).then_some(statuses),
        exclude_tool_messages: query.exclude_tool_messages,
        order: query.order,
    };

    let page = ledger.list_messages(&thread_id, args).await?;
    Ok(Json(page))
}

/// Append messages to a thread in one commit
pub async fn save_messages(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
    Json(req): Json<SaveMessagesRequest>,
) -> ApiResult<(StatusCode, Json<SaveMessagesResult>)> {
    if req.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    let saved = state
        .persist
        .ledger()
        .save_messages(&thread_id, req.messages, req.options)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Move a pending message to success or failed
pub async fn finalize_message(
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<String>,
    Json(req): Json<FinalizeMessage>,
) -> ApiResult<Json<MessageDoc>> {
    let doc = state
        .persist
        .ledger()
        .finalize_message(&message_id, req)
        .await?;
    Ok(Json(doc))
}
