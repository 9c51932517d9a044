//! Messaging HTTP Handlers
//!
//! Posting persists the message first and only then fans it out to the
//! space's live connections. History endpoints page with a limit+1 fetch so
//! `hasMore` needs no count query.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::{require_space_access, AuthUser};
use crate::backend::server::state::AppState;
use crate::backend::store::{BotStore, MemberStore, MessageStore, Stores};
use crate::shared::message::{MessageListQuery, PostMessageRequest};
use crate::shared::{Identity, Message, MessageListResponse, SenderType};

/// Who is posting, as recorded on the message
struct Sender {
    id: Uuid,
    name: String,
    kind: SenderType,
}

async fn resolve_sender(stores: &Stores, identity: &Identity) -> Result<Sender, BackendError> {
    match *identity {
        Identity::Bot { bot_id, .. } => {
            let bot = stores
                .bots
                .get_by_id(bot_id)
                .await?
                .ok_or_else(|| BackendError::not_found("bot not found"))?;
            if bot.is_muted {
                return Err(BackendError::forbidden("bot is muted"));
            }
            Ok(Sender {
                id: bot.id,
                name: bot.name,
                kind: SenderType::Bot,
            })
        }
        Identity::User { user_id } => {
            let user = stores
                .members
                .get_user(user_id)
                .await?
                .ok_or_else(|| BackendError::not_found("user not found"))?;
            Ok(Sender {
                id: user.id,
                name: user.sender_name().to_string(),
                kind: SenderType::User,
            })
        }
    }
}

fn page_limit(requested: Option<usize>, max: usize) -> usize {
    requested.unwrap_or(max).clamp(1, max)
}

/// POST /api/v1/bot-spaces/{botSpaceId}/messages
pub async fn post_message(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>), BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    request.validate(state.config.max_message_length)?;

    let sender = resolve_sender(&state.stores, &identity).await?;
    let message = Message::new(bot_space_id, sender.id, sender.name, sender.kind, request.content);
    let stored = state.stores.messages.insert(&message).await?;

    let payload = serde_json::to_vec(&stored)?;
    let delivered = state.hub.broadcast(bot_space_id, Bytes::from(payload));
    tracing::info!(
        "[Messaging] Message {} posted in space {}, delivered live to {}",
        stored.id,
        bot_space_id,
        delivered
    );

    Ok((StatusCode::CREATED, Json(stored)))
}

/// GET /api/v1/bot-spaces/{botSpaceId}/messages?limit&before
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<MessageListResponse>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;

    let limit = page_limit(query.limit, state.config.max_messages_per_page);
    let messages = state
        .stores
        .messages
        .list_by_space(bot_space_id, limit + 1, query.before)
        .await?;

    Ok(Json(MessageListResponse::from_overfetch(messages, limit)))
}

/// GET /api/v1/bot-spaces/{botSpaceId}/messages/since/{messageId}?limit
///
/// Catch-up for clients that reconnect after missing live broadcasts.
pub async fn messages_since(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, message_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<MessageListResponse>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;

    let limit = page_limit(query.limit, state.config.max_messages_per_page);
    let messages = state
        .stores
        .messages
        .list_since(bot_space_id, message_id, limit + 1)
        .await?;

    Ok(Json(MessageListResponse::from_overfetch(messages, limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_is_clamped() {
        assert_eq!(page_limit(None, 30), 30);
        assert_eq!(page_limit(Some(10), 30), 10);
        assert_eq!(page_limit(Some(500), 30), 30);
        assert_eq!(page_limit(Some(0), 30), 1);
    }
}
