/**
 * Room Subscription Handler
 *
 * `GET /api/v1/bot-spaces/{botSpaceId}/messages/ws` upgrades to a WebSocket
 * and registers it with the hub. The stream is one-way: every message
 * posted to the space arrives as a JSON text frame. Inbound frames are only
 * used as liveness signals.
 *
 * Browsers cannot set headers on a WebSocket handshake, so the token may be
 * passed as `?token=`.
 */

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    response::Response,
};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::backend::middleware::{require_space_access, AuthUser};
use crate::backend::server::state::AppState;

/// Upgrade and join the space's room
pub async fn handle_room_subscription(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Result<Response, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;

    let hub = state.hub.clone();
    let max_frame = hub.config().max_frame_bytes;
    Ok(ws
        .max_message_size(max_frame)
        .max_frame_size(max_frame)
        .on_upgrade(move |socket| async move {
            let connection = hub.register_connection(bot_space_id, socket);
            tracing::info!(
                "[Hub] Connection {} subscribed to space {}",
                connection.id(),
                bot_space_id
            );
        }))
}
