/**
 * Task Assignment State Machine
 *
 * Lifecycle of a space task:
 *
 * ```text
 * (new) ──────────────► available ──accept/assign──► in_progress ──complete──► completed
 *   └──create with bot──────────────────────────────────┘      └────block─────► blocked
 * ```
 *
 * `completed` and `blocked` are terminal. A bot holds at most one
 * `in_progress` task per space. Every transition takes the affected bot's
 * [`KeyedLocks`] entry, checks the bot's active task, writes and updates the
 * bot's status line while still holding it. The store backs this up with a
 * compare-and-set on the previous status and a uniqueness rule on active
 * tasks, so a racing writer elsewhere still loses cleanly.
 *
 * # Check order
 *
 * After the caller's role is established every operation evaluates, in
 * order: task exists, task belongs to the space, status precondition, actor
 * or target checks, active-task guard, write.
 *
 * # Status side effect
 *
 * Once the task write has committed, the affected bot's status line is set
 * to `Working on <name>` (entering `in_progress`) or cleared (leaving it).
 * The bot's lock is released only after this upsert, so status lines land
 * in transition order. A failure there is logged and does not undo the
 * transition.
 */
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::locks::KeyedLocks;
use crate::backend::store::{BotStatusStore, BotStore, StoreError, Stores, TaskStore};
use crate::shared::{Bot, BotStatus, Identity, SpaceTask, TaskStatus};

/// Rejections from the task state machine
#[derive(Debug, Error)]
pub enum TaskError {
    /// The transition would break a lifecycle or single-active-task rule
    #[error("{message}")]
    Conflict {
        message: String,
        /// The bot's existing active task, when that caused the rejection
        current_task: Option<Box<SpaceTask>>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl TaskError {
    fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            current_task: None,
        }
    }

    fn active(message: impl Into<String>, current: SpaceTask) -> Self {
        Self::Conflict {
            message: message.into(),
            current_task: Some(Box::new(current)),
        }
    }

    fn task_not_found() -> Self {
        Self::NotFound("task not found".to_string())
    }
}

/// Fields of a task to create
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub description: String,
    /// Assign straight to this bot
    pub bot_id: Option<Uuid>,
}

/// Entry point for every task operation
pub struct TaskService {
    tasks: Arc<dyn TaskStore>,
    statuses: Arc<dyn BotStatusStore>,
    bots: Arc<dyn BotStore>,
    locks: KeyedLocks,
}

impl TaskService {
    pub fn new(stores: &Stores) -> Self {
        Self {
            tasks: stores.tasks.clone(),
            statuses: stores.statuses.clone(),
            bots: stores.bots.clone(),
            locks: KeyedLocks::new(),
        }
    }

    /// Per-bot locks, exposed so the server can prune them
    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Create a task, optionally assigning it straight away
    pub async fn create_task(
        &self,
        bot_space_id: Uuid,
        actor: &Identity,
        new_task: NewTask,
    ) -> Result<SpaceTask, TaskError> {
        let manager_id = require_manager(actor, bot_space_id, "only manager bots can create tasks")?;
        let mut task = SpaceTask::new(bot_space_id, new_task.name, new_task.description, manager_id);

        let Some(target_id) = new_task.bot_id else {
            let created = self.tasks.insert(&task).await?;
            tracing::info!("[Tasks] Created task {} in space {}", created.id, bot_space_id);
            return Ok(created);
        };

        let target = self.target_bot(bot_space_id, target_id).await?;
        let _guard = self.locks.lock(bot_space_id, target_id).await;
        if let Some(active) = self.tasks.get_active_by_bot(bot_space_id, target_id).await? {
            return Err(TaskError::active("bot already has an active task", active));
        }
        task.status = TaskStatus::InProgress;
        task.bot_id = Some(target_id);
        let created = match self.tasks.insert(&task).await {
            Ok(created) => created,
            Err(StoreError::UniqueViolation(_)) => {
                return Err(self.lost_race(bot_space_id, target_id, "bot already has an active task").await)
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "[Tasks] Created task {} in space {} assigned to bot {}",
            created.id,
            bot_space_id,
            target_id
        );
        self.record_status(&target, manager_id, created.working_status()).await;
        Ok(created)
    }

    /// A bot takes an available task for itself
    pub async fn accept_task(
        &self,
        bot_space_id: Uuid,
        actor: &Identity,
        task_id: Uuid,
    ) -> Result<SpaceTask, TaskError> {
        let bot_id = require_bot(actor, bot_space_id, "only bots can accept tasks")?;
        let task = self.task_in_space(bot_space_id, task_id).await?;
        if task.status != TaskStatus::Available {
            return Err(TaskError::conflict("task is not available"));
        }

        let _guard = self.locks.lock(bot_space_id, bot_id).await;
        let accepted = self
            .start(task, bot_id, "you already have an active task")
            .await?;

        tracing::info!("[Tasks] Bot {} accepted task {}", bot_id, accepted.id);
        match self.bots.get_by_id(bot_id).await {
            Ok(Some(bot)) => self.record_status(&bot, bot_id, accepted.working_status()).await,
            Ok(None) => tracing::warn!("[Tasks] Bot {} vanished before its status update", bot_id),
            Err(e) => tracing::error!("[Tasks] Failed to load bot {} for status update: {}", bot_id, e),
        }
        Ok(accepted)
    }

    /// A manager hands an available task to a bot
    pub async fn assign_task(
        &self,
        bot_space_id: Uuid,
        actor: &Identity,
        task_id: Uuid,
        target_id: Uuid,
    ) -> Result<SpaceTask, TaskError> {
        let manager_id = require_manager(actor, bot_space_id, "only manager bots can assign tasks")?;
        let task = self.task_in_space(bot_space_id, task_id).await?;
        if task.status != TaskStatus::Available {
            return Err(TaskError::conflict("task is not available"));
        }
        let target = self.target_bot(bot_space_id, target_id).await?;

        let _guard = self.locks.lock(bot_space_id, target_id).await;
        let assigned = self
            .start(task, target_id, "bot already has an active task")
            .await?;

        tracing::info!(
            "[Tasks] Manager {} assigned task {} to bot {}",
            manager_id,
            assigned.id,
            target_id
        );
        self.record_status(&target, manager_id, assigned.working_status()).await;
        Ok(assigned)
    }

    /// The assigned bot finishes its task
    pub async fn complete_task(
        &self,
        bot_space_id: Uuid,
        actor: &Identity,
        task_id: Uuid,
    ) -> Result<SpaceTask, TaskError> {
        let bot_id = require_bot(actor, bot_space_id, "only bots can complete tasks")?;
        self.finish(bot_space_id, bot_id, task_id, TaskStatus::Completed).await
    }

    /// The assigned bot gives up on its task
    pub async fn block_task(
        &self,
        bot_space_id: Uuid,
        actor: &Identity,
        task_id: Uuid,
    ) -> Result<SpaceTask, TaskError> {
        let bot_id = require_bot(actor, bot_space_id, "only bots can block tasks")?;
        self.finish(bot_space_id, bot_id, task_id, TaskStatus::Blocked).await
    }

    /// Tasks visible to the caller
    ///
    /// Managers see everything, optionally filtered by `status`. Other bots
    /// only ever see `available` tasks.
    pub async fn list_tasks(
        &self,
        bot_space_id: Uuid,
        actor: &Identity,
        status: Option<TaskStatus>,
    ) -> Result<Vec<SpaceTask>, TaskError> {
        require_bot(actor, bot_space_id, "only bots can list tasks")?;
        let filter = if actor.is_manager() {
            status
        } else {
            Some(TaskStatus::Available)
        };
        Ok(self.tasks.list_by_space(bot_space_id, filter).await?)
    }

    /// The caller's active task
    pub async fn current_task(&self, bot_space_id: Uuid, actor: &Identity) -> Result<SpaceTask, TaskError> {
        let bot_id = require_bot(actor, bot_space_id, "only bots can get their current task")?;
        self.tasks
            .get_active_by_bot(bot_space_id, bot_id)
            .await?
            .ok_or_else(|| TaskError::NotFound("no active task".to_string()))
    }

    /// Move an available task to `in_progress` for `bot_id`
    ///
    /// The caller holds `bot_id`'s lock.
    async fn start(&self, task: SpaceTask, bot_id: Uuid, busy: &str) -> Result<SpaceTask, TaskError> {
        let bot_space_id = task.bot_space_id;

        if let Some(active) = self.tasks.get_active_by_bot(bot_space_id, bot_id).await? {
            return Err(TaskError::active(busy, active));
        }

        let started = SpaceTask {
            status: TaskStatus::InProgress,
            bot_id: Some(bot_id),
            updated_at: Utc::now(),
            ..task
        };
        match self.tasks.update_if_status(&started, TaskStatus::Available).await {
            Ok(Some(stored)) => Ok(stored),
            // Another bot took it between our read and write
            Ok(None) => Err(TaskError::conflict("task is not available")),
            Err(StoreError::UniqueViolation(_)) => Err(self.lost_race(bot_space_id, bot_id, busy).await),
            Err(e) => Err(e.into()),
        }
    }

    async fn finish(
        &self,
        bot_space_id: Uuid,
        bot_id: Uuid,
        task_id: Uuid,
        outcome: TaskStatus,
    ) -> Result<SpaceTask, TaskError> {
        // Only the assignee may finish, so the actor's lock is the task's lock
        let _guard = self.locks.lock(bot_space_id, bot_id).await;
        let task = self.task_in_space(bot_space_id, task_id).await?;
        if task.status != TaskStatus::InProgress {
            return Err(TaskError::conflict("task is not in progress"));
        }
        if !task.is_assigned_to(bot_id) {
            return Err(TaskError::conflict("you are not assigned to this task"));
        }

        let now = Utc::now();
        let finished = SpaceTask {
            status: outcome,
            completed_at: (outcome == TaskStatus::Completed).then_some(now),
            updated_at: now,
            ..task
        };
        let stored = self
            .tasks
            .update_if_status(&finished, TaskStatus::InProgress)
            .await?
            .ok_or_else(|| TaskError::conflict("task is not in progress"))?;

        tracing::info!("[Tasks] Bot {} moved task {} to {}", bot_id, stored.id, outcome);
        match self.bots.get_by_id(bot_id).await {
            Ok(Some(bot)) => self.record_status(&bot, bot_id, String::new()).await,
            Ok(None) => tracing::warn!("[Tasks] Bot {} vanished before its status update", bot_id),
            Err(e) => tracing::error!("[Tasks] Failed to load bot {} for status update: {}", bot_id, e),
        }
        Ok(stored)
    }

    async fn task_in_space(&self, bot_space_id: Uuid, task_id: Uuid) -> Result<SpaceTask, TaskError> {
        match self.tasks.get_by_id(task_id).await? {
            Some(task) if task.bot_space_id == bot_space_id => Ok(task),
            _ => Err(TaskError::task_not_found()),
        }
    }

    async fn target_bot(&self, bot_space_id: Uuid, bot_id: Uuid) -> Result<Bot, TaskError> {
        match self.bots.get_by_id(bot_id).await? {
            Some(bot) if bot.bot_space_id == bot_space_id => Ok(bot),
            _ => Err(TaskError::NotFound("target bot not found".to_string())),
        }
    }

    /// The store's uniqueness rule fired; report whichever task won
    async fn lost_race(&self, bot_space_id: Uuid, bot_id: Uuid, busy: &str) -> TaskError {
        match self.tasks.get_active_by_bot(bot_space_id, bot_id).await {
            Ok(Some(active)) => TaskError::active(busy, active),
            Ok(None) => TaskError::conflict(busy),
            Err(e) => e.into(),
        }
    }

    async fn record_status(&self, bot: &Bot, updated_by: Uuid, status: String) {
        let row = BotStatus::new(bot.bot_space_id, bot.id, bot.name.clone(), status, updated_by);
        if let Err(e) = self.statuses.upsert(&row).await {
            tracing::error!("[Tasks] Failed to update status for bot {}: {}", bot.id, e);
        }
    }
}

fn require_bot(actor: &Identity, bot_space_id: Uuid, message: &str) -> Result<Uuid, TaskError> {
    match (actor.bot_id(), actor.bot_space_id()) {
        (Some(bot_id), Some(space)) if space == bot_space_id => Ok(bot_id),
        _ => Err(TaskError::Forbidden(message.to_string())),
    }
}

fn require_manager(actor: &Identity, bot_space_id: Uuid, message: &str) -> Result<Uuid, TaskError> {
    let bot_id = require_bot(actor, bot_space_id, message)?;
    if !actor.is_manager() {
        return Err(TaskError::Forbidden(message.to_string()));
    }
    Ok(bot_id)
}
