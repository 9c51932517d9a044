/**
 * API Route Configuration
 *
 * Every endpoint lives under `/api/v1/bot-spaces/{botSpaceId}` and requires
 * a valid token. Layers run outermost first:
 *
 * 1. `auth_middleware` - verify the token, attach the `Identity`
 * 2. `track_last_seen` - throttled bot activity write
 *
 * # Routes
 *
 * ## Messages
 * - `POST /messages` - Post a message and broadcast it to the space
 * - `GET /messages?limit&before` - History, newest first
 * - `GET /messages/since/{messageId}?limit` - Catch-up, oldest first
 * - `GET /messages/ws` - WebSocket subscription
 *
 * ## Tasks
 * - `POST /tasks`, `GET /tasks?status`, `GET /tasks/current`
 * - `POST /tasks/{taskId}/accept|assign|complete|block`
 *
 * ## Statuses
 * - `GET /statuses`, `PUT /statuses`
 * - `GET /statuses/{botId}`, `PUT /statuses/{botId}`
 *
 * ## Bots
 * - `GET /bots`, `GET /bots/{botId}`, `DELETE /bots/{botId}`
 * - `PUT|DELETE /bots/{botId}/manager`, `PUT|DELETE /bots/{botId}/mute`
 */

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::backend::bots;
use crate::backend::messaging::{list_messages, messages_since, post_message};
use crate::backend::middleware::{auth_middleware, track_last_seen};
use crate::backend::realtime::handle_room_subscription;
use crate::backend::server::state::AppState;
use crate::backend::statuses::{bulk_update_statuses, get_status, list_statuses, update_status};
use crate::backend::tasks::handlers as tasks;

/// Prefix shared by every tenant-scoped route
pub const SPACE_PREFIX: &str = "/api/v1/bot-spaces/{botSpaceId}";

fn space_routes() -> Router<AppState> {
    Router::new()
        // Messages
        .route("/messages", post(post_message).get(list_messages))
        .route("/messages/since/{messageId}", get(messages_since))
        .route("/messages/ws", get(handle_room_subscription))
        // Tasks
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/current", get(tasks::current_task))
        .route("/tasks/{taskId}/accept", post(tasks::accept_task))
        .route("/tasks/{taskId}/assign", post(tasks::assign_task))
        .route("/tasks/{taskId}/complete", post(tasks::complete_task))
        .route("/tasks/{taskId}/block", post(tasks::block_task))
        // Statuses
        .route("/statuses", get(list_statuses).put(bulk_update_statuses))
        .route("/statuses/{botId}", get(get_status).put(update_status))
        // Bots
        .route("/bots", get(bots::list_bots))
        .route("/bots/{botId}", get(bots::get_bot).delete(bots::remove_bot))
        .route(
            "/bots/{botId}/manager",
            put(bots::assign_manager).delete(bots::remove_manager),
        )
        .route("/bots/{botId}/mute", put(bots::mute_bot).delete(bots::unmute_bot))
}

/// Configure API routes
///
/// `route_layer` keeps unmatched paths returning 404 instead of 401.
pub fn configure_api_routes(router: Router<AppState>, app_state: &AppState) -> Router<AppState> {
    let protected = space_routes()
        .route_layer(from_fn_with_state(app_state.clone(), track_last_seen))
        .route_layer(from_fn_with_state(app_state.clone(), auth_middleware));

    router
        .route("/health", get(|| async { "ok" }))
        .nest(SPACE_PREFIX, protected)
}
