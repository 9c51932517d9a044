/**
 * Message Data Structure
 *
 * This module defines the chat record posted into a bot space and the
 * request/response bodies used by the messaging endpoints.
 *
 * A `Message` is immutable once created. The server persists it first and
 * then fans the serialized JSON out to every live subscriber of the space.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Who posted a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    /// A human member of the space
    User,
    /// A bot registered in the space
    Bot,
}

impl SenderType {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "user",
            SenderType::Bot => "bot",
        }
    }

    /// Parse the database representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(SenderType::User),
            "bot" => Some(SenderType::Bot),
            _ => None,
        }
    }
}

/// A single chat message scoped to one bot space
///
/// # Example
/// ```rust
/// use clawswarm::shared::message::{Message, SenderType};
/// use uuid::Uuid;
///
/// let space = Uuid::new_v4();
/// let message = Message::new(space, Uuid::new_v4(), "builder-1", SenderType::Bot, "hello");
/// assert_eq!(message.bot_space_id, space);
/// assert_eq!(message.content, "hello");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub bot_space_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_type: SenderType,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message with a fresh id and the current UTC timestamp
    pub fn new(
        bot_space_id: Uuid,
        sender_id: Uuid,
        sender_name: impl Into<String>,
        sender_type: SenderType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_space_id,
            sender_id,
            sender_name: sender_name.into(),
            sender_type,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Body of `POST /messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

impl PostMessageRequest {
    /// Reject empty content and content longer than `max_length` bytes
    pub fn validate(&self, max_length: usize) -> Result<(), SharedError> {
        if self.content.trim().is_empty() {
            return Err(SharedError::validation("content", "message must not be empty"));
        }
        if self.content.len() > max_length {
            return Err(SharedError::validation("content", "message too long"));
        }
        Ok(())
    }
}

/// Query parameters for the history endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageListQuery {
    /// Page size, clamped to the configured maximum
    pub limit: Option<usize>,
    /// Return messages older than this message id
    pub before: Option<Uuid>,
}

/// A page of messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageListResponse {
    pub messages: Vec<Message>,
    pub count: usize,
    pub has_more: bool,
}

impl MessageListResponse {
    /// Build a page from a result fetched with `limit + 1` rows
    ///
    /// The extra row only signals that more history exists; it is dropped.
    pub fn from_overfetch(mut messages: Vec<Message>, limit: usize) -> Self {
        let has_more = messages.len() > limit;
        if has_more {
            messages.truncate(limit);
        }
        Self {
            count: messages.len(),
            messages,
            has_more,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> Vec<Message> {
        let space = Uuid::new_v4();
        (0..n)
            .map(|i| Message::new(space, Uuid::new_v4(), "bot", SenderType::Bot, format!("m{i}")))
            .collect()
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let message = sample(1).remove(0);
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("botSpaceId").is_some());
        assert!(json.get("senderName").is_some());
        assert_eq!(json["senderType"], "bot");
    }

    #[test]
    fn test_post_request_validation() {
        let ok = PostMessageRequest { content: "hi".to_string() };
        assert!(ok.validate(10).is_ok());

        let empty = PostMessageRequest { content: "   ".to_string() };
        assert!(empty.validate(10).is_err());

        let long = PostMessageRequest { content: "x".repeat(11) };
        assert_eq!(
            long.validate(10),
            Err(SharedError::validation("content", "message too long"))
        );
    }

    #[test]
    fn test_sender_type_parse() {
        assert_eq!(SenderType::parse("user"), Some(SenderType::User));
        assert_eq!(SenderType::parse("bot"), Some(SenderType::Bot));
        assert_eq!(SenderType::parse("robot"), None);
        assert_eq!(SenderType::Bot.as_str(), "bot");
    }

    #[test]
    fn test_overfetch_sets_has_more() {
        let page = MessageListResponse::from_overfetch(sample(4), 3);
        assert!(page.has_more);
        assert_eq!(page.count, 3);
        assert_eq!(page.messages.len(), 3);
    }

    #[test]
    fn test_overfetch_exact_page() {
        let page = MessageListResponse::from_overfetch(sample(3), 3);
        assert!(!page.has_more);
        assert_eq!(page.count, 3);
    }
}
