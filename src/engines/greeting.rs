pub const GREETINGS: &[&str] = &["hi", "hello", "hey"];
pub const GREETING_REPLY: &str = "Hello! How can I assist you today?";

/// Canned reply for small talk, so it never reaches the search backend.
///
/// Exact match after lowercasing; surrounding whitespace is not stripped.
pub fn respond(query: &str) -> Option<&'static str> {
    if GREETINGS.contains(&query.to_lowercase().as_str()) {
        Some(GREETING_REPLY)
    } else {
        None
    }
}
