use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar glyph shown next to user messages.
pub const USER_AVATAR: &str = "💬";
/// Avatar glyph shown next to assistant messages.
pub const ASSISTANT_AVATAR: &str = "🦙";

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message record of a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Display glyph; system messages carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>, avatar: Option<&str>) -> Self {
        Self {
            role,
            content: content.into(),
            avatar: avatar.map(str::to_owned),
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, None)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, Some(USER_AVATAR))
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, Some(ASSISTANT_AVATAR))
    }
}

/// Append-only log of chat messages, oldest first.
///
/// The transcript is the only session state the chat window keeps: it grows
/// by one user/assistant pair per turn and is never edited in place. Past
/// records are only reachable by shared reference.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Pretty-printed JSON rendering, used by transcript export.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("first"));
        transcript.push(ChatMessage::assistant("second"));
        transcript.push(ChatMessage::user("third"));

        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn constructors_attach_expected_avatars() {
        assert_eq!(ChatMessage::user("hi").avatar.as_deref(), Some(USER_AVATAR));
        assert_eq!(
            ChatMessage::assistant("hi").avatar.as_deref(),
            Some(ASSISTANT_AVATAR)
        );
        assert_eq!(ChatMessage::system("hi").avatar, None);
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = ChatMessage::system("be nice");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"role\":\"system\""), "{json}");
    }

    #[test]
    fn transcript_json_round_trips() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::user("q"));
        transcript.push(ChatMessage::assistant("a"));

        let json = transcript.to_json().unwrap();
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.messages()[0].role, Role::User);
        assert_eq!(back.messages()[1].content, "a");
    }
}
