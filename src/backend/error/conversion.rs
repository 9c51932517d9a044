/**
 * Error Conversion
 *
 * `BackendError` implements `IntoResponse`, so handlers return it directly.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "bot already has an active task",
 *   "status": 409,
 *   "currentTask": { ... }
 * }
 * ```
 *
 * `currentTask` is only present on conflicts caused by the bot's existing
 * active task.
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::error::types::BackendError;

impl IntoResponse for BackendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("[Error] {}", self);
        }

        let mut body = serde_json::json!({
            "error": self.message(),
            "status": status.as_u16(),
        });
        if let Some(task) = self.current_task() {
            match serde_json::to_value(task) {
                Ok(task) => body["currentTask"] = task,
                Err(e) => tracing::warn!("[Error] Failed to serialize current task: {}", e),
            }
        }

        (status, Json(body)).into_response()
    }
}
