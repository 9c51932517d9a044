//! Bot Status HTTP Handlers
//!
//! Anyone with access to the space can read status lines. Only a manager bot
//! of the space may set them directly; the task state machine writes them as
//! a side effect of transitions.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::{require_manager_bot, require_space_access, AuthUser};
use crate::backend::server::state::AppState;
use crate::backend::store::{BotStatusStore, BotStore};
use crate::shared::status::{BulkUpdateBotStatusRequest, UpdateBotStatusRequest};
use crate::shared::{Bot, BotStatus};

/// Look up a bot that must belong to this space
async fn space_bot(state: &AppState, bot_space_id: Uuid, bot_id: Uuid) -> Result<Bot, BackendError> {
    state
        .stores
        .bots
        .get_by_id(bot_id)
        .await?
        .filter(|bot| bot.bot_space_id == bot_space_id)
        .ok_or_else(|| BackendError::not_found(format!("bot not found: {}", bot_id)))
}

/// GET /statuses
pub async fn list_statuses(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
) -> Result<Json<Vec<BotStatus>>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    let statuses = state.stores.statuses.list_by_space(bot_space_id).await?;
    Ok(Json(statuses))
}

/// GET /statuses/{botId}
pub async fn get_status(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BotStatus>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    state
        .stores
        .statuses
        .get(bot_space_id, bot_id)
        .await?
        .map(Json)
        .ok_or_else(|| BackendError::not_found("bot status not found"))
}

/// PUT /statuses/{botId}
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, bot_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateBotStatusRequest>,
) -> Result<Json<BotStatus>, BackendError> {
    let manager_id = require_manager_bot(&identity, bot_space_id)?;
    let bot = space_bot(&state, bot_space_id, bot_id).await?;

    let status = BotStatus::new(bot_space_id, bot.id, bot.name, request.status, manager_id);
    let stored = state.stores.statuses.upsert(&status).await?;
    tracing::debug!("[Statuses] Bot {} status set by manager {}", bot_id, manager_id);
    Ok(Json(stored))
}

/// PUT /statuses
///
/// All target bots are resolved before anything is written, so an unknown
/// bot leaves every status untouched.
pub async fn bulk_update_statuses(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
    Json(request): Json<BulkUpdateBotStatusRequest>,
) -> Result<Json<Vec<BotStatus>>, BackendError> {
    let manager_id = require_manager_bot(&identity, bot_space_id)?;

    let mut statuses = Vec::with_capacity(request.statuses.len());
    for update in request.statuses {
        let bot = space_bot(&state, bot_space_id, update.bot_id).await?;
        statuses.push(BotStatus::new(bot_space_id, bot.id, bot.name, update.status, manager_id));
    }

    let stored = state.stores.statuses.bulk_upsert(&statuses).await?;
    tracing::info!(
        "[Statuses] Manager {} updated {} statuses in space {}",
        manager_id,
        stored.len(),
        bot_space_id
    );
    Ok(Json(stored))
}
