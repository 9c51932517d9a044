//! Persistence Module
//!
//! The core never touches storage directly. It talks to the traits defined
//! here, each scoped by bot space and entity id. Two implementations exist:
//!
//! - **`postgres`** - `PgStore`, backed by a sqlx `PgPool`
//! - **`memory`** - `MemoryStore`, process-local maps used when no database is
//!   configured and by the test suite
//!
//! Every write is all-or-nothing per call. Both implementations enforce that
//! a bot holds at most one `in_progress` task per space: a write that would
//! break this fails with [`StoreError::UniqueViolation`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::{Bot, BotStatus, Message, SpaceTask, TaskStatus, User};

/// In-memory store
pub mod memory;

/// PostgreSQL store
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors surfaced by the persistence collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced row does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Task rows
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task and return the stored row
    async fn insert(&self, task: &SpaceTask) -> Result<SpaceTask, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<SpaceTask>, StoreError>;

    /// Tasks of a space, oldest first, optionally filtered by status
    async fn list_by_space(
        &self,
        bot_space_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<SpaceTask>, StoreError>;

    /// The bot's `in_progress` task in this space, if any
    async fn get_active_by_bot(
        &self,
        bot_space_id: Uuid,
        bot_id: Uuid,
    ) -> Result<Option<SpaceTask>, StoreError>;

    /// Write `task` only if the stored row still has status `expected`
    ///
    /// Returns `None` when the row is missing or its status moved on.
    async fn update_if_status(
        &self,
        task: &SpaceTask,
        expected: TaskStatus,
    ) -> Result<Option<SpaceTask>, StoreError>;
}

/// Bot status rows, one per (space, bot)
#[async_trait]
pub trait BotStatusStore: Send + Sync {
    async fn get(&self, bot_space_id: Uuid, bot_id: Uuid) -> Result<Option<BotStatus>, StoreError>;

    async fn list_by_space(&self, bot_space_id: Uuid) -> Result<Vec<BotStatus>, StoreError>;

    /// Insert or replace the (space, bot) row and return the result
    async fn upsert(&self, status: &BotStatus) -> Result<BotStatus, StoreError>;

    /// Upsert every row or none of them
    async fn bulk_upsert(&self, statuses: &[BotStatus]) -> Result<Vec<BotStatus>, StoreError>;
}

/// Chat history
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert(&self, message: &Message) -> Result<Message, StoreError>;

    /// Newest first, older than `before` when given
    async fn list_by_space(
        &self,
        bot_space_id: Uuid,
        limit: usize,
        before: Option<Uuid>,
    ) -> Result<Vec<Message>, StoreError>;

    /// Oldest first, strictly newer than `since`
    async fn list_since(
        &self,
        bot_space_id: Uuid,
        since: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    /// Spaces holding more than `cap` messages
    async fn spaces_exceeding(&self, cap: usize) -> Result<Vec<Uuid>, StoreError>;

    /// Delete all but the `keep` newest messages of a space
    ///
    /// Returns the number of messages removed.
    async fn delete_beyond(&self, bot_space_id: Uuid, keep: usize) -> Result<u64, StoreError>;
}

/// Bot directory
#[async_trait]
pub trait BotStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Bot>, StoreError>;

    /// Bots of a space, oldest first
    async fn list_by_space(&self, bot_space_id: Uuid) -> Result<Vec<Bot>, StoreError>;

    async fn update_last_seen(&self, id: Uuid) -> Result<(), StoreError>;

    /// Grant or revoke the manager role and return the updated bot
    async fn set_manager(&self, id: Uuid, is_manager: bool) -> Result<Bot, StoreError>;

    /// Mute or unmute a bot and return the updated bot
    async fn set_muted(&self, id: Uuid, is_muted: bool) -> Result<Bot, StoreError>;

    /// Remove a bot along with its status row
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Human accounts and space membership
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn is_member(&self, bot_space_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Whether the user owns the space
    async fn is_owner(&self, bot_space_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;
}

/// Handles to every store the backend uses
#[derive(Clone)]
pub struct Stores {
    pub tasks: Arc<dyn TaskStore>,
    pub statuses: Arc<dyn BotStatusStore>,
    pub messages: Arc<dyn MessageStore>,
    pub bots: Arc<dyn BotStore>,
    pub members: Arc<dyn MemberStore>,
}

impl Stores {
    /// Use one backing store for every concern
    pub fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: TaskStore + BotStatusStore + MessageStore + BotStore + MemberStore + 'static,
    {
        Self {
            tasks: store.clone(),
            statuses: store.clone(),
            messages: store.clone(),
            bots: store.clone(),
            members: store,
        }
    }
}
