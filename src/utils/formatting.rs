use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::message::Message;

pub fn format_timestamp(ts: SystemTime) -> String {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(duration) => format!("{}.{:03}", duration.as_secs(), duration.subsec_millis()),
        Err(_) => "0".to_string(),
    }
}

/// Pretty-print `content` as JSON when enabled and it parses; otherwise
/// return it unchanged.
pub fn format_content(content: &str, format_json: bool) -> String {
    if !format_json {
        return content.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_string()),
        Err(_) => content.to_string(),
    }
}

/// Messages whose content or destination contains `query`, ignoring case.
pub fn filter_messages<'a>(messages: impl IntoIterator<Item = &'a Message>, query: &str) -> Vec<&'a Message> {
    let query = query.trim().to_lowercase();
    messages
        .into_iter()
        .filter(|message| {
            query.is_empty()
                || message.content.to_lowercase().contains(&query)
                || message.destination.to_lowercase().contains(&query)
        })
        .collect()
}
