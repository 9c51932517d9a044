//! Bot Status Types
//!
//! One free-text status line per (space, bot). The task state machine keeps
//! it in step with the bot's active task; managers may also set it directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current status line of a bot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub id: Uuid,
    pub bot_space_id: Uuid,
    pub bot_id: Uuid,
    pub bot_name: String,
    pub status: String,
    pub updated_by_bot_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BotStatus {
    pub fn new(
        bot_space_id: Uuid,
        bot_id: Uuid,
        bot_name: impl Into<String>,
        status: impl Into<String>,
        updated_by_bot_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bot_space_id,
            bot_id,
            bot_name: bot_name.into(),
            status: status.into(),
            updated_by_bot_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Body of `PUT /statuses/{botId}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateBotStatusRequest {
    pub status: String,
}

/// One entry of a bulk update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatusUpdate {
    pub bot_id: Uuid,
    pub status: String,
}

/// Body of `PUT /statuses`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpdateBotStatusRequest {
    pub statuses: Vec<BotStatusUpdate>,
}
