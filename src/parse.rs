//! Helper functions for pulling text out of search engine HTML.

use scraper::{Html, Selector};

/// Returns the trimmed text of the first element in `body` that matches
/// `selector`, or `None` if nothing matches.
///
/// The HTML parser never fails, so partial or broken markup just yields fewer
/// matches. Only an invalid selector is an error.
pub fn first_match_text(body: &str, selector: &str) -> eyre::Result<Option<String>> {
    let selector =
        Selector::parse(selector).map_err(|e| eyre::eyre!("invalid selector {selector:?}: {e:?}"))?;

    let dom = Html::parse_document(body);

    Ok(dom
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string()))
}
