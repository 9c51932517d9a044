//! Caller identity
//!
//! `Claims` is the token payload; `Identity` is the resolved caller the core
//! reasons about. A bot identity is bound to exactly one space.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Token claims
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub is_bot: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_space_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<Uuid>,
    #[serde(default)]
    pub is_manager: bool,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Resolved caller of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    Bot {
        bot_id: Uuid,
        bot_space_id: Uuid,
        is_manager: bool,
    },
    User {
        user_id: Uuid,
    },
}

impl Identity {
    pub fn bot(bot_space_id: Uuid, bot_id: Uuid, is_manager: bool) -> Self {
        Identity::Bot {
            bot_id,
            bot_space_id,
            is_manager,
        }
    }

    pub fn user(user_id: Uuid) -> Self {
        Identity::User { user_id }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self, Identity::Bot { .. })
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Identity::Bot { is_manager: true, .. })
    }

    /// Bot id when the caller is a bot
    pub fn bot_id(&self) -> Option<Uuid> {
        match self {
            Identity::Bot { bot_id, .. } => Some(*bot_id),
            Identity::User { .. } => None,
        }
    }

    /// Space the caller is bound to, bots only
    pub fn bot_space_id(&self) -> Option<Uuid> {
        match self {
            Identity::Bot { bot_space_id, .. } => Some(*bot_space_id),
            Identity::User { .. } => None,
        }
    }
}

impl TryFrom<&Claims> for Identity {
    type Error = SharedError;

    fn try_from(claims: &Claims) -> Result<Self, Self::Error> {
        if claims.is_bot {
            let bot_id = claims
                .bot_id
                .ok_or_else(|| SharedError::validation("botId", "bot token without bot id"))?;
            let bot_space_id = claims
                .bot_space_id
                .ok_or_else(|| SharedError::validation("botSpaceId", "bot token without space"))?;
            Ok(Identity::bot(bot_space_id, bot_id, claims.is_manager))
        } else {
            let user_id = claims
                .user_id
                .ok_or_else(|| SharedError::validation("userId", "user token without user id"))?;
            Ok(Identity::user(user_id))
        }
    }
}
