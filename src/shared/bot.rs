//! Bot and user records consumed by the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An automated participant scoped to one bot space
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bot {
    pub id: Uuid,
    pub bot_space_id: Uuid,
    pub name: String,
    pub is_manager: bool,
    pub is_muted: bool,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bot {
    pub fn new(bot_space_id: Uuid, name: impl Into<String>, is_manager: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_space_id,
            name: name.into(),
            is_manager,
            is_muted: false,
            last_seen_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A human account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
}

impl User {
    /// Name shown as a message sender
    pub fn sender_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_name_falls_back_to_email() {
        let mut user = User {
            id: Uuid::new_v4(),
            email: "ops@example.com".to_string(),
            display_name: None,
        };
        assert_eq!(user.sender_name(), "ops@example.com");
        user.display_name = Some("Ops".to_string());
        assert_eq!(user.sender_name(), "Ops");
    }
}
