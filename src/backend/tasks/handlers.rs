/**
 * Task HTTP Handlers
 *
 * Thin adapters over `TaskService`. Each handler checks space access, turns
 * the request into a service call and maps the result to a response. Every
 * lifecycle rule lives in the state machine.
 *
 * # Routes
 *
 * - `POST /tasks` - Create a task (manager bot)
 * - `GET /tasks?status=` - List tasks
 * - `GET /tasks/current` - Caller's active task
 * - `POST /tasks/{taskId}/accept` - Take an available task
 * - `POST /tasks/{taskId}/assign` - Hand an available task to a bot (manager bot)
 * - `POST /tasks/{taskId}/complete` - Finish the caller's task
 * - `POST /tasks/{taskId}/block` - Give up on the caller's task
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::machine::NewTask;
use crate::backend::error::BackendError;
use crate::backend::middleware::{require_space_access, AuthUser};
use crate::backend::server::state::AppState;
use crate::shared::task::{AssignTaskRequest, CreateSpaceTaskRequest, TaskListQuery};
use crate::shared::{SpaceTask, TaskStatus};

/// POST /tasks
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
    Json(request): Json<CreateSpaceTaskRequest>,
) -> Result<(StatusCode, Json<SpaceTask>), BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    request.validate()?;

    let new_task = NewTask {
        name: request.name.trim().to_string(),
        description: request.description,
        bot_id: request.bot_id,
    };
    let task = state.tasks.create_task(bot_space_id, &identity, new_task).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// GET /tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Vec<SpaceTask>>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            TaskStatus::parse(raw)
                .ok_or_else(|| BackendError::bad_request(format!("invalid status: {}", raw)))?,
        ),
        None => None,
    };

    let tasks = state.tasks.list_tasks(bot_space_id, &identity, status).await?;
    Ok(Json(tasks))
}

/// GET /tasks/current
pub async fn current_task(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(bot_space_id): Path<Uuid>,
) -> Result<Json<SpaceTask>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    let task = state.tasks.current_task(bot_space_id, &identity).await?;
    Ok(Json(task))
}

/// POST /tasks/{taskId}/accept
pub async fn accept_task(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SpaceTask>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    let task = state.tasks.accept_task(bot_space_id, &identity, task_id).await?;
    Ok(Json(task))
}

/// POST /tasks/{taskId}/assign
pub async fn assign_task(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, task_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<AssignTaskRequest>,
) -> Result<Json<SpaceTask>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    let task = state
        .tasks
        .assign_task(bot_space_id, &identity, task_id, request.bot_id)
        .await?;
    Ok(Json(task))
}

/// POST /tasks/{taskId}/complete
pub async fn complete_task(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SpaceTask>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    let task = state.tasks.complete_task(bot_space_id, &identity, task_id).await?;
    Ok(Json(task))
}

/// POST /tasks/{taskId}/block
pub async fn block_task(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path((bot_space_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SpaceTask>, BackendError> {
    require_space_access(&identity, bot_space_id, state.stores.members.as_ref()).await?;
    let task = state.tasks.block_task(bot_space_id, &identity, task_id).await?;
    Ok(Json(task))
}
