//! Errors that end a `/scrape` request early.
//!
//! Each variant maps to one status code and a JSON body with an `error` key,
//! so clients never see a bare panic or an empty response.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{ratelimit::RateLimitError, web::ApiResponse};

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    /// The `url` query parameter was absent or empty.
    #[error("Missing 'url' parameter")]
    MissingParameter,

    /// Reaching or reading the search backend failed. Holds the cause.
    #[error("Failed to fetch results: {0}")]
    Fetch(String),

    /// The upstream request budget is spent for now.
    #[error("Too many requests: {0}")]
    RateLimited(#[from] RateLimitError),
}

impl AnswerError {
    pub fn status(&self) -> StatusCode {
        match self {
            AnswerError::MissingParameter => StatusCode::BAD_REQUEST,
            AnswerError::Fetch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AnswerError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn to_api_response(&self) -> ApiResponse {
        match self {
            AnswerError::MissingParameter => ApiResponse::error("Missing 'url' parameter", None),
            AnswerError::Fetch(cause) => {
                ApiResponse::error("Failed to fetch results", Some(cause.clone()))
            }
            AnswerError::RateLimited(err) => {
                ApiResponse::error("Too many requests", Some(err.to_string()))
            }
        }
    }
}

impl IntoResponse for AnswerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(self.to_api_response());
        match self {
            AnswerError::RateLimited(err) => (
                status,
                [(header::RETRY_AFTER, err.retry_after_secs().to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}
