//! In-memory persistence
//!
//! All tables live behind a single `RwLock`, so every trait call observes and
//! mutates a consistent snapshot. Used when `DATABASE_URL` is unset and by
//! the test suite.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BotStatusStore, BotStore, MemberStore, MessageStore, StoreError, TaskStore};
use crate::shared::{Bot, BotStatus, Message, SpaceTask, TaskStatus, User};

#[derive(Default)]
struct Tables {
    tasks: HashMap<Uuid, SpaceTask>,
    statuses: HashMap<(Uuid, Uuid), BotStatus>,
    /// Insertion order is creation order
    messages: Vec<Message>,
    bots: HashMap<Uuid, Bot>,
    users: HashMap<Uuid, User>,
    members: HashSet<(Uuid, Uuid)>,
    owners: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    /// Whether writing `task` would give its bot a second `in_progress` task
    fn conflicts_with_active(&self, task: &SpaceTask) -> bool {
        let Some(bot_id) = task.bot_id else {
            return false;
        };
        task.status == TaskStatus::InProgress
            && self.tasks.values().any(|other| {
                other.id != task.id
                    && other.bot_space_id == task.bot_space_id
                    && other.bot_id == Some(bot_id)
                    && other.status == TaskStatus::InProgress
            })
    }

    fn bot_mut(&mut self, id: Uuid) -> Result<&mut Bot, StoreError> {
        self.bots.get_mut(&id).ok_or(StoreError::NotFound("bot"))
    }

    fn message_position(&self, bot_space_id: Uuid, id: Uuid) -> Result<usize, StoreError> {
        self.messages
            .iter()
            .position(|m| m.id == id && m.bot_space_id == bot_space_id)
            .ok_or(StoreError::NotFound("message"))
    }
}

/// Process-local store implementing every persistence trait
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bot
    pub async fn add_bot(&self, bot: Bot) {
        self.tables.write().await.bots.insert(bot.id, bot);
    }

    /// Register a user and make them a member of `bot_space_id`
    pub async fn add_member(&self, bot_space_id: Uuid, user: User) {
        let mut tables = self.tables.write().await;
        tables.members.insert((bot_space_id, user.id));
        tables.users.insert(user.id, user);
    }

    /// Register a user as owner (and member) of `bot_space_id`
    pub async fn add_owner(&self, bot_space_id: Uuid, user: User) {
        let mut tables = self.tables.write().await;
        tables.owners.insert((bot_space_id, user.id));
        tables.members.insert((bot_space_id, user.id));
        tables.users.insert(user.id, user);
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert(&self, task: &SpaceTask) -> Result<SpaceTask, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.tasks.contains_key(&task.id) {
            return Err(StoreError::UniqueViolation(format!("task {} exists", task.id)));
        }
        if tables.conflicts_with_active(task) {
            return Err(StoreError::UniqueViolation("bot already has an active task".to_string()));
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<SpaceTask>, StoreError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn list_by_space(
        &self,
        bot_space_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<SpaceTask>, StoreError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<SpaceTask> = tables
            .tasks
            .values()
            .filter(|t| t.bot_space_id == bot_space_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn get_active_by_bot(
        &self,
        bot_space_id: Uuid,
        bot_id: Uuid,
    ) -> Result<Option<SpaceTask>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .find(|t| {
                t.bot_space_id == bot_space_id
                    && t.bot_id == Some(bot_id)
                    && t.status == TaskStatus::InProgress
            })
            .cloned())
    }

    async fn update_if_status(
        &self,
        task: &SpaceTask,
        expected: TaskStatus,
    ) -> Result<Option<SpaceTask>, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get(&task.id) {
            Some(stored) if stored.status == expected => {}
            _ => return Ok(None),
        }
        if tables.conflicts_with_active(task) {
            return Err(StoreError::UniqueViolation("bot already has an active task".to_string()));
        }
        tables.tasks.insert(task.id, task.clone());
        Ok(Some(task.clone()))
    }
}

#[async_trait]
impl BotStatusStore for MemoryStore {
    async fn get(&self, bot_space_id: Uuid, bot_id: Uuid) -> Result<Option<BotStatus>, StoreError> {
        Ok(self.tables.read().await.statuses.get(&(bot_space_id, bot_id)).cloned())
    }

    async fn list_by_space(&self, bot_space_id: Uuid) -> Result<Vec<BotStatus>, StoreError> {
        let tables = self.tables.read().await;
        let mut statuses: Vec<BotStatus> = tables
            .statuses
            .values()
            .filter(|s| s.bot_space_id == bot_space_id)
            .cloned()
            .collect();
        statuses.sort_by(|a, b| a.bot_name.cmp(&b.bot_name));
        Ok(statuses)
    }

    async fn upsert(&self, status: &BotStatus) -> Result<BotStatus, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(upsert_row(&mut tables, status))
    }

    async fn bulk_upsert(&self, statuses: &[BotStatus]) -> Result<Vec<BotStatus>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(statuses.iter().map(|s| upsert_row(&mut tables, s)).collect())
    }
}

/// Keep the original row id and creation time, replace the rest
fn upsert_row(tables: &mut Tables, status: &BotStatus) -> BotStatus {
    let key = (status.bot_space_id, status.bot_id);
    let row = match tables.statuses.get(&key) {
        Some(existing) => BotStatus {
            id: existing.id,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..status.clone()
        },
        None => status.clone(),
    };
    tables.statuses.insert(key, row.clone());
    row
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, message: &Message) -> Result<Message, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.messages.iter().any(|m| m.id == message.id) {
            return Err(StoreError::UniqueViolation(format!("message {} exists", message.id)));
        }
        tables.messages.push(message.clone());
        Ok(message.clone())
    }

    async fn list_by_space(
        &self,
        bot_space_id: Uuid,
        limit: usize,
        before: Option<Uuid>,
    ) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.read().await;
        let end = match before {
            Some(cursor) => tables.message_position(bot_space_id, cursor)?,
            None => tables.messages.len(),
        };
        Ok(tables.messages[..end]
            .iter()
            .rev()
            .filter(|m| m.bot_space_id == bot_space_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_since(
        &self,
        bot_space_id: Uuid,
        since: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let tables = self.tables.read().await;
        let start = tables.message_position(bot_space_id, since)? + 1;
        Ok(tables.messages[start..]
            .iter()
            .filter(|m| m.bot_space_id == bot_space_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn spaces_exceeding(&self, cap: usize) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for message in &tables.messages {
            *counts.entry(message.bot_space_id).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .filter(|&(_, count)| count > cap)
            .map(|(space, _)| space)
            .collect())
    }

    async fn delete_beyond(&self, bot_space_id: Uuid, keep: usize) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let total = tables.messages.iter().filter(|m| m.bot_space_id == bot_space_id).count();
        let mut excess = total.saturating_sub(keep);
        let deleted = excess as u64;
        // Oldest come first, so drop from the front
        tables.messages.retain(|m| {
            if excess > 0 && m.bot_space_id == bot_space_id {
                excess -= 1;
                return false;
            }
            true
        });
        Ok(deleted)
    }
}

#[async_trait]
impl BotStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Bot>, StoreError> {
        Ok(self.tables.read().await.bots.get(&id).cloned())
    }

    async fn list_by_space(&self, bot_space_id: Uuid) -> Result<Vec<Bot>, StoreError> {
        let tables = self.tables.read().await;
        let mut bots: Vec<Bot> = tables
            .bots
            .values()
            .filter(|b| b.bot_space_id == bot_space_id)
            .cloned()
            .collect();
        bots.sort_by_key(|b| b.created_at);
        Ok(bots)
    }

    async fn update_last_seen(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.bot_mut(id)?.last_seen_at = Some(Utc::now());
        Ok(())
    }

    async fn set_manager(&self, id: Uuid, is_manager: bool) -> Result<Bot, StoreError> {
        let mut tables = self.tables.write().await;
        let bot = tables.bot_mut(id)?;
        bot.is_manager = is_manager;
        Ok(bot.clone())
    }

    async fn set_muted(&self, id: Uuid, is_muted: bool) -> Result<Bot, StoreError> {
        let mut tables = self.tables.write().await;
        let bot = tables.bot_mut(id)?;
        bot.is_muted = is_muted;
        Ok(bot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let bot = tables.bots.remove(&id).ok_or(StoreError::NotFound("bot"))?;
        tables.statuses.remove(&(bot.bot_space_id, id));
        // Finished tasks outlive their bot without an assignee
        for task in tables.tasks.values_mut().filter(|t| t.bot_id == Some(id)) {
            task.bot_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl MemberStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn is_member(&self, bot_space_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.members.contains(&(bot_space_id, user_id)))
    }

    async fn is_owner(&self, bot_space_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.read().await.owners.contains(&(bot_space_id, user_id)))
    }
}
