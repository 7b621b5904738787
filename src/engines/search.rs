//! The web search backend: DuckDuckGo's JavaScript-free results page by default.
//!
//! Any backend that serves an HTML results page for `?q=<query>` works, as long
//! as `search.result_selector` points at its organic result title links.

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT},
    StatusCode,
};
use tracing::{debug, trace};
use url::Url;

use super::error_chain;
use crate::{config::SearchConfig, error::AnswerError, parse::first_match_text};

pub const DEFAULT_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Title link of an organic result on DuckDuckGo's HTML page. If DuckDuckGo
/// changes its markup every search silently becomes a miss, so this is the one
/// place to update.
pub const RESULT_TITLE_SELECTOR: &str = "a.result__a";

// we pretend to be a normal browser so the backend doesn't block us outright
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

pub const NO_RESULT_FALLBACK: &str = "No relevant information found.";

#[derive(Debug)]
pub struct SearchRequest {
    pub url: Url,
    pub headers: HeaderMap,
}

#[derive(Debug)]
pub struct SearchResponse {
    pub status: StatusCode,
    pub body: String,
}

impl SearchRequest {
    pub fn new(config: &SearchConfig, query: &str) -> Result<Self, AnswerError> {
        let url = Url::parse_with_params(&config.endpoint, &[("q", query)])
            .map_err(|e| AnswerError::Fetch(format!("invalid search endpoint: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| AnswerError::Fetch(format!("invalid user agent: {e}")))?,
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        Ok(Self { url, headers })
    }

    pub async fn send(
        self,
        client: &reqwest::Client,
        max_body_bytes: u64,
    ) -> Result<SearchResponse, AnswerError> {
        let mut res = client
            .get(self.url)
            .headers(self.headers)
            .send()
            .await
            .map_err(|e| AnswerError::Fetch(error_chain(&e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(AnswerError::Fetch(format!(
                "search backend returned {status}"
            )));
        }

        if res.content_length().unwrap_or_default() > max_body_bytes {
            return Err(AnswerError::Fetch("response too large".into()));
        }

        // content-length can be missing or wrong, so count as we go too
        let mut body_bytes = Vec::new();
        while let Some(chunk) = res
            .chunk()
            .await
            .map_err(|e| AnswerError::Fetch(error_chain(&e)))?
        {
            body_bytes.extend_from_slice(&chunk);
            if body_bytes.len() as u64 > max_body_bytes {
                return Err(AnswerError::Fetch("response too large".into()));
            }
        }
        let body = String::from_utf8_lossy(&body_bytes).to_string();

        Ok(SearchResponse { status, body })
    }
}

/// Text of the first organic result title, or [`NO_RESULT_FALLBACK`] when the
/// page has none (no results, changed markup, a captcha page...).
pub fn parse_response(body: &str, result_selector: &str) -> Result<String, AnswerError> {
    let title = first_match_text(body, result_selector)
        .map_err(|e| AnswerError::Fetch(e.to_string()))?;

    Ok(match title {
        Some(title) => title,
        None => {
            debug!("no element matched {result_selector:?}");
            NO_RESULT_FALLBACK.to_string()
        }
    })
}

pub async fn search(
    client: &reqwest::Client,
    config: &SearchConfig,
    query: &str,
) -> Result<String, AnswerError> {
    let request = SearchRequest::new(config, query)?;
    trace!(url = %request.url, "requesting search results");

    let response = request.send(client, config.max_body_bytes).await?;
    debug!(
        status = %response.status,
        bytes = response.body.len(),
        "search response received"
    );

    parse_response(&response.body, &config.result_selector)
}
