use serde::{Deserialize, Serialize};

use crate::core::message::Message;

pub const DEFAULT_SESSION_NAME_LIMIT: usize = 50;
const ELLIPSIS: &str = "...";

/// A chat session and its transcript.
///
/// The transcript is append-only while an exchange succeeds; a failed
/// exchange truncates it back to where it started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            name: None,
            messages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn needs_name(&self) -> bool {
        self.messages.is_empty() && self.name.as_deref().is_none_or(str::is_empty)
    }

    /// Title shown for the session: the explicit name, else the first
    /// message, else a short form of the id.
    pub fn display_title(&self, limit: usize) -> String {
        if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
            return name.to_string();
        }
        if let Some(first) = self.messages.first() {
            return derive_session_name(&first.content, limit);
        }
        let tail_start = self
            .session_id
            .char_indices()
            .rev()
            .nth(5)
            .map(|(index, _)| index)
            .unwrap_or(0);
        format!("Session {}", &self.session_id[tail_start..])
    }
}

/// Truncate `text` to `limit` characters, marking the cut with an ellipsis.
pub fn derive_session_name(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut name: String = text.chars().take(limit).collect();
    name.push_str(ELLIPSIS);
    name
}
