use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use strand_persist::PersistError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Persist(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Persist(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Persist(ref e) if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Persistence error: {}", e);
                "Storage error".to_string()
            }
            ApiError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                "Configuration error".to_string()
            }
            ApiError::Internal => {
                tracing::error!("Internal error: {}", self);
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persist_errors_map_to_status() {
        let cases = [
            (PersistError::ThreadNotFound("t".to_string()), StatusCode::NOT_FOUND),
            (PersistError::StreamNotFound("s".to_string()), StatusCode::NOT_FOUND),
            (PersistError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (PersistError::InvalidCursor("x".to_string()), StatusCode::BAD_REQUEST),
            (PersistError::Internal("boom".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), status);
        }
    }

    #[test]
    fn test_bad_request() {
        let response = ApiError::BadRequest("Test error".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
