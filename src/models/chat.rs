//! Conversation history exchanged with the chat endpoint.

use serde::{Deserialize, Serialize};

/// Number of prior turns kept when building a prompt.
pub const MAX_HISTORY_TURNS: usize = 10;

/// Speaker of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    /// Any role the prompt builder does not understand.
    #[serde(other)]
    Other,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Other => "other",
        }
    }

    /// Label used when history is flattened into plain text.
    pub fn label(self) -> Option<&'static str> {
        match self {
            ChatRole::User => Some("User"),
            ChatRole::Assistant => Some("Assistant"),
            ChatRole::System | ChatRole::Other => None,
        }
    }

    pub fn is_conversational(self) -> bool {
        matches!(self, ChatRole::User | ChatRole::Assistant)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// Parse a JSON-encoded history array. Malformed input yields an empty history.
pub fn parse_history(raw: Option<&str>) -> Vec<ChatMessage> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<ChatMessage>>(raw) {
        Ok(history) => history,
        Err(e) => {
            tracing::debug!("ignoring malformed chat history: {e}");
            Vec::new()
        }
    }
}

/// The most recent turns (at most [`MAX_HISTORY_TURNS`]) that a prompt may carry.
///
/// The window is taken first and non-conversational roles are dropped from it
/// afterwards, so a window containing system turns yields fewer than ten entries.
pub fn recent_turns(history: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    history[start..]
        .iter()
        .filter(|m| m.role.is_conversational())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_history() {
        let history = parse_history(Some(
            r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#,
        ));
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("hi"));
        assert_eq!(history[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_parse_history_unknown_role() {
        let history = parse_history(Some(r#"[{"role":"tool","content":"x"}]"#));
        assert_eq!(history[0].role, ChatRole::Other);
    }

    #[test]
    fn test_parse_history_malformed() {
        assert!(parse_history(Some("not json")).is_empty());
        assert!(parse_history(Some("")).is_empty());
        assert!(parse_history(None).is_empty());
    }

    #[test]
    fn test_recent_turns_truncates_to_ten() {
        let history: Vec<ChatMessage> = (0..15)
            .map(|i| ChatMessage::user(format!("turn {i}")))
            .collect();
        let kept: Vec<&ChatMessage> = recent_turns(&history).collect();
        assert_eq!(kept.len(), 10);
        assert_eq!(kept[0].content, "turn 5");
        assert_eq!(kept[9].content, "turn 14");
    }

    #[test]
    fn test_recent_turns_drops_other_roles() {
        let history = vec![
            ChatMessage::system("be nice"),
            ChatMessage::user("q"),
            ChatMessage::new(ChatRole::Other, "tool output"),
            ChatMessage::assistant("a"),
        ];
        let kept: Vec<&ChatMessage> = recent_turns(&history).collect();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].role, ChatRole::User);
        assert_eq!(kept[1].role, ChatRole::Assistant);
    }
}
