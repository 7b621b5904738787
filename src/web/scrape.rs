use std::sync::{Arc, PoisonError};

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::{debug, error, warn};

use super::{ApiResponse, AppState};
use crate::{
    engines::{greeting, search},
    error::AnswerError,
};

pub async fn route(
    State(state): State<Arc<AppState>>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ApiResponse>, AnswerError> {
    // a repeated `url` keeps its first value
    let query = match params {
        Ok(Query(params)) => params
            .into_iter()
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value)
            .unwrap_or_default(),
        Err(rejection) => {
            debug!("couldn't read query string: {rejection}");
            String::new()
        }
    };
    if query.is_empty() {
        return Err(AnswerError::MissingParameter);
    }
    debug!(query = %query, "answering");

    if let Some(reply) = greeting::respond(&query) {
        return Ok(Json(ApiResponse::answer(reply)));
    }

    if let Some(limiter) = &state.limiter {
        // the guard is dropped before we await anything
        let acquired = limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_acquire();
        if let Err(err) = acquired {
            warn!("Upstream budget spent: {err}");
            return Err(err.into());
        }
    }

    match search::search(&state.client, &state.config.search, &query).await {
        Ok(answer) => Ok(Json(ApiResponse::answer(answer))),
        Err(err) => {
            error!("Search error: {err}");
            Err(err)
        }
    }
}
