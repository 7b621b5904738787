use std::{error::Error, fmt::Write};

use crate::config::SearchConfig;

pub mod greeting;
pub mod search;

/// One client for the whole process so connections to the backend get reused.
/// The user agent is sent per request by [`search::SearchRequest`].
pub fn build_client(config: &SearchConfig) -> eyre::Result<reqwest::Client> {
    Ok(reqwest::ClientBuilder::new()
        .timeout(config.timeout)
        .build()?)
}

/// `err` followed by each of its sources, so "error sending request" also says
/// whether it was a timeout, a refused connection, a dns failure...
pub(crate) fn error_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_str = cause.to_string();
        if !out.contains(&cause_str) {
            let _ = write!(out, ": {cause_str}");
        }
        source = cause.source();
    }
    out
}
