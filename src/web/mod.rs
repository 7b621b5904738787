pub mod health;
pub mod scrape;

use std::sync::{Arc, Mutex};

use axum::{routing::get, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{config::Config, engines, ratelimit::RateLimiter};

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
    /// Only present when `rate_limit.enabled` is set.
    pub limiter: Option<Mutex<RateLimiter>>,
}

impl AppState {
    pub fn new(config: Config) -> eyre::Result<Self> {
        let client = engines::build_client(&config.search)?;
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Mutex::new(RateLimiter::new(config.rate_limit.max_requests_per_minute)));
        Ok(Self {
            config,
            client,
            limiter,
        })
    }
}

/// The JSON body of every `/scrape` response.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ApiResponse {
    Answer {
        response: String,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
}

impl ApiResponse {
    pub fn answer(response: impl Into<String>) -> Self {
        Self::Answer {
            response: response.into(),
        }
    }

    pub fn error(error: &str, details: Option<String>) -> Self {
        Self::Error {
            error: error.to_string(),
            details,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scrape", get(scrape::route))
        .route("/health", get(health::route))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> eyre::Result<()> {
    let bind = config.bind;
    if config.rate_limit.enabled {
        info!(
            "Upstream searches limited to {} per minute",
            config.rate_limit.max_requests_per_minute
        );
    }

    let app = router(Arc::new(AppState::new(config)?));

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
