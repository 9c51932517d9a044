//! Bot Directory HTTP Handlers
//!
//! Members and bots of a space can list and look up its bots. Changing a
//! bot (removing it, granting or revoking the manager role, muting it) is
//! reserved for the space owner.
//!
//! Role and mute changes apply to the stored bot immediately. A bot's token
//! keeps the manager flag it was issued with until the bot refreshes it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::{require_owner, require_space_access, AuthUser};
use crate::backend::server::state::AppState;
use crate::backend::store::{BotStore, TaskStore};
use crate::backend::tasks::TaskError;
use crate::shared::Bot;

async fn space_bot(state: &AppState, bot_space_id: Uuid, bot_id: Uuid) -> Result<Bot, BackendError> {
    state
        .stores
        .bots
        .get_by_id(bot_id)
        .await?
        .filter(|bot| bot.bot_space_id == bot_space_id)
        .ok_or_else(|| BackendError::not_found("bot not found"))
}

/// GET /bots
pub async fn list_bots(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
) -> Result<Json<Vec<Bot>>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    Ok(Json(state.stores.bots.list_by_space(bot_space_id).await?))
}

/// GET /bots/{botId}
pub async fn get_bot(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Bot>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    Ok(Json(space_bot(&state, bot_space_id, bot_id).await?))
}

/// DELETE /bots/{botId}
///
/// A bot holding an `in_progress` task cannot be removed; it must finish or
/// block the task first.
pub async fn remove_bot(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, BackendError> {
    let owner_id = require_owner(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    space_bot(&state, bot_space_id, bot_id).await?;

    // Same lock as task transitions, so no accept slips in before the delete
    let _guard = state.tasks.locks().lock(bot_space_id, bot_id).await;
    if let Some(active) = state.stores.tasks.get_active_by_bot(bot_space_id, bot_id).await? {
        return Err(TaskError::Conflict {
            message: "bot has an active task".to_string(),
            current_task: Some(Box::new(active)),
        }
        .into());
    }
    state.stores.bots.delete(bot_id).await?;

    tracing::info!("[Bots] Owner {} removed bot {} from space {}", owner_id, bot_id, bot_space_id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /bots/{botId}/manager
pub async fn assign_manager(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Bot>, BackendError> {
    require_owner(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    space_bot(&state, bot_space_id, bot_id).await?;

    let bot = state.stores.bots.set_manager(bot_id, true).await?;
    tracing::info!("[Bots] Bot {} is now a manager of space {}", bot_id, bot_space_id);
    Ok(Json(bot))
}

/// DELETE /bots/{botId}/manager
pub async fn remove_manager(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, BackendError> {
    require_owner(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    space_bot(&state, bot_space_id, bot_id).await?;

    state.stores.bots.set_manager(bot_id, false).await?;
    tracing::info!("[Bots] Bot {} is no longer a manager of space {}", bot_id, bot_space_id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /bots/{botId}/mute
pub async fn mute_bot(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Bot>, BackendError> {
    require_owner(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    space_bot(&state, bot_space_id, bot_id).await?;

    let bot = state.stores.bots.set_muted(bot_id, true).await?;
    tracing::info!("[Bots] Bot {} muted in space {}", bot_id, bot_space_id);
    Ok(Json(bot))
}

/// DELETE /bots/{botId}/mute
pub async fn unmute_bot(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, BackendError> {
    require_owner(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    space_bot(&state, bot_space_id, bot_id).await?;

    state.stores.bots.set_muted(bot_id, false).await?;
    tracing::info!("[Bots] Bot {} unmuted in space {}", bot_id, bot_space_id);
    Ok(StatusCode::NO_CONTENT)
}
