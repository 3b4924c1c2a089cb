use std::collections::VecDeque;
use std::time::SystemTime;

pub(crate) const UNKNOWN_DESTINATION: &str = "Unknown";
pub(crate) const MAX_RECENT_DESTINATIONS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub destination: String,
    pub content: String,
    pub timestamp: SystemTime,
}

impl Message {
    /// Builds a received message, falling back to `"Unknown"` when the frame
    /// carried no destination.
    pub fn received(destination: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            destination: destination.unwrap_or(UNKNOWN_DESTINATION).to_string(),
            content: content.into(),
            timestamp: SystemTime::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentType {
    #[default]
    Text,
    Json,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            Self::Text => "text/plain",
            Self::Json => "application/json",
        }
    }
}

/// Appends `message` and evicts from the front until at most `cap` remain.
pub(crate) fn push_capped(messages: &mut VecDeque<Message>, message: Message, cap: usize) {
    messages.push_back(message);
    while messages.len() > cap {
        let _ = messages.pop_front();
    }
}

/// Most-recently-used destinations, newest first, without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecentDestinations {
    entries: VecDeque<String>,
}

impl RecentDestinations {
    pub fn touch(&mut self, destination: &str) {
        self.entries.retain(|entry| entry != destination);
        self.entries.push_front(destination.to_string());
        self.entries.truncate(MAX_RECENT_DESTINATIONS);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(content: &str) -> Message {
        Message::received(Some("/topic/t"), content)
    }

    #[test]
    fn buffer_keeps_newest_entries() {
        let mut messages = VecDeque::new();
        for content in ["m1", "m2", "m3", "m4", "m5"] {
            push_capped(&mut messages, message(content), 3);
        }

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m3", "m4", "m5"]);
    }

    #[test]
    fn lowered_cap_trims_on_next_insert() {
        let mut messages = VecDeque::new();
        for content in ["m1", "m2", "m3", "m4"] {
            push_capped(&mut messages, message(content), 10);
        }
        push_capped(&mut messages, message("m5"), 2);

        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m4", "m5"]);
    }

    #[test]
    fn zero_cap_keeps_nothing() {
        let mut messages = VecDeque::new();
        push_capped(&mut messages, message("m1"), 0);
        assert!(messages.is_empty());
    }

    #[test]
    fn missing_destination_falls_back_to_unknown() {
        assert_eq!(Message::received(None, "x").destination, "Unknown");
    }

    #[test]
    fn recent_destinations_move_to_front_and_cap() {
        let mut recent = RecentDestinations::default();
        for destination in ["A", "B", "C", "A", "D", "E"] {
            recent.touch(destination);
        }
        assert_eq!(recent.to_vec(), ["E", "D", "A", "C", "B"]);

        recent.touch("F");
        assert_eq!(recent.to_vec(), ["F", "E", "D", "A", "C"]);
        assert_eq!(recent.len(), 5);
    }
}
