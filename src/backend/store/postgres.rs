//! PostgreSQL persistence
//!
//! Runtime-checked sqlx queries against the schema in `migrations/`. The
//! partial unique index on `space_tasks(bot_space_id, bot_id)` for
//! `in_progress` rows backs the one-active-task rule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{BotStatusStore, BotStore, MemberStore, MessageStore, StoreError, TaskStore};
use crate::shared::{Bot, BotStatus, Message, SenderType, SpaceTask, TaskStatus, User};

const TASK_COLUMNS: &str = "id, bot_space_id, name, description, status, bot_id, \
     created_by_bot_id, completed_at, created_at, updated_at";

const STATUS_COLUMNS: &str =
    "id, bot_space_id, bot_id, bot_name, status, updated_by_bot_id, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, bot_space_id, sender_id, sender_name, sender_type, content, created_at";

const BOT_COLUMNS: &str = "id, bot_space_id, name, is_manager, is_muted, last_seen_at, created_at";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

fn map_db_error(e: sqlx::Error) -> StoreError {
    let is_unique = e
        .as_database_error()
        .and_then(|db| db.code())
        .map_or(false, |code| code == UNIQUE_VIOLATION);
    if is_unique {
        StoreError::UniqueViolation(e.to_string())
    } else {
        StoreError::Database(e)
    }
}

fn decode_error(column: &str, value: &str) -> StoreError {
    StoreError::Database(sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("unexpected value {value:?}").into(),
    })
}

fn task_from_row(row: &PgRow) -> Result<SpaceTask, StoreError> {
    let status: String = row.try_get("status")?;
    Ok(SpaceTask {
        id: row.try_get("id")?,
        bot_space_id: row.try_get("bot_space_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        status: TaskStatus::parse(&status).ok_or_else(|| decode_error("status", &status))?,
        bot_id: row.try_get("bot_id")?,
        created_by_bot_id: row.try_get("created_by_bot_id")?,
        completed_at: row.try_get("completed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn status_from_row(row: &PgRow) -> Result<BotStatus, StoreError> {
    Ok(BotStatus {
        id: row.try_get("id")?,
        bot_space_id: row.try_get("bot_space_id")?,
        bot_id: row.try_get("bot_id")?,
        bot_name: row.try_get("bot_name")?,
        status: row.try_get("status")?,
        updated_by_bot_id: row.try_get("updated_by_bot_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn bot_from_row(row: &PgRow) -> Result<Bot, StoreError> {
    Ok(Bot {
        id: row.try_get("id")?,
        bot_space_id: row.try_get("bot_space_id")?,
        name: row.try_get("name")?,
        is_manager: row.try_get("is_manager")?,
        is_muted: row.try_get("is_muted")?,
        last_seen_at: row.try_get("last_seen_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, StoreError> {
    let sender_type: String = row.try_get("sender_type")?;
    Ok(Message {
        id: row.try_get("id")?,
        bot_space_id: row.try_get("bot_space_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_name: row.try_get("sender_name")?,
        sender_type: SenderType::parse(&sender_type)
            .ok_or_else(|| decode_error("sender_type", &sender_type))?,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert(&self, task: &SpaceTask) -> Result<SpaceTask, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO space_tasks ({TASK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(task.bot_space_id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.bot_id)
        .bind(task.created_by_bot_id)
        .bind(task.completed_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        task_from_row(&row)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<SpaceTask>, StoreError> {
        let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM space_tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn list_by_space(
        &self,
        bot_space_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<SpaceTask>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM space_tasks
            WHERE bot_space_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at ASC
            "#
        ))
        .bind(bot_space_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(task_from_row).collect()
    }

    async fn get_active_by_bot(
        &self,
        bot_space_id: Uuid,
        bot_id: Uuid,
    ) -> Result<Option<SpaceTask>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM space_tasks
            WHERE bot_space_id = $1 AND bot_id = $2 AND status = 'in_progress'
            LIMIT 1
            "#
        ))
        .bind(bot_space_id)
        .bind(bot_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(task_from_row).transpose()
    }

    async fn update_if_status(
        &self,
        task: &SpaceTask,
        expected: TaskStatus,
    ) -> Result<Option<SpaceTask>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE space_tasks
            SET status = $3, bot_id = $4, completed_at = $5, updated_at = $6
            WHERE id = $1 AND status = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(expected.as_str())
        .bind(task.status.as_str())
        .bind(task.bot_id)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.as_ref().map(task_from_row).transpose()
    }
}

const UPSERT_STATUS: &str = r#"
    INSERT INTO bot_statuses (id, bot_space_id, bot_id, bot_name, status, updated_by_bot_id, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    ON CONFLICT (bot_space_id, bot_id)
    DO UPDATE SET bot_name = EXCLUDED.bot_name,
                  status = EXCLUDED.status,
                  updated_by_bot_id = EXCLUDED.updated_by_bot_id,
                  updated_at = NOW()
    RETURNING id, bot_space_id, bot_id, bot_name, status, updated_by_bot_id, created_at, updated_at
"#;

#[async_trait]
impl BotStatusStore for PgStore {
    async fn get(&self, bot_space_id: Uuid, bot_id: Uuid) -> Result<Option<BotStatus>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {STATUS_COLUMNS} FROM bot_statuses WHERE bot_space_id = $1 AND bot_id = $2"
        ))
        .bind(bot_space_id)
        .bind(bot_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(status_from_row).transpose()
    }

    async fn list_by_space(&self, bot_space_id: Uuid) -> Result<Vec<BotStatus>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {STATUS_COLUMNS} FROM bot_statuses WHERE bot_space_id = $1 ORDER BY bot_name ASC"
        ))
        .bind(bot_space_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(status_from_row).collect()
    }

    async fn upsert(&self, status: &BotStatus) -> Result<BotStatus, StoreError> {
        let row = bind_status(sqlx::query(UPSERT_STATUS), status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        status_from_row(&row)
    }

    async fn bulk_upsert(&self, statuses: &[BotStatus]) -> Result<Vec<BotStatus>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(statuses.len());
        for status in statuses {
            let row = bind_status(sqlx::query(UPSERT_STATUS), status)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_error)?;
            stored.push(status_from_row(&row)?);
        }
        // Dropping the transaction on an early return rolls it back
        tx.commit().await?;
        Ok(stored)
    }
}

fn bind_status<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    status: &'q BotStatus,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(status.id)
        .bind(status.bot_space_id)
        .bind(status.bot_id)
        .bind(&status.bot_name)
        .bind(&status.status)
        .bind(status.updated_by_bot_id)
        .bind(status.created_at)
        .bind(status.updated_at)
}

impl PgStore {
    async fn message_created_at(
        &self,
        bot_space_id: Uuid,
        id: Uuid,
    ) -> Result<DateTime<Utc>, StoreError> {
        let row = sqlx::query("SELECT created_at FROM messages WHERE id = $1 AND bot_space_id = $2")
            .bind(id)
            .bind(bot_space_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("message"))?;

        Ok(row.try_get("created_at")?)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert(&self, message: &Message) -> Result<Message, StoreError> {
        // Read back so callers see the timestamp at the precision history pages return
        let row = sqlx::query(&format!(
            "INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.id)
        .bind(message.bot_space_id)
        .bind(message.sender_id)
        .bind(&message.sender_name)
        .bind(message.sender_type.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        message_from_row(&row)
    }

    async fn list_by_space(
        &self,
        bot_space_id: Uuid,
        limit: usize,
        before: Option<Uuid>,
    ) -> Result<Vec<Message>, StoreError> {
        let cutoff = match before {
            Some(cursor) => Some(self.message_created_at(bot_space_id, cursor).await?),
            None => None,
        };

        // (created_at, id) totally orders messages sharing a timestamp
        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE bot_space_id = $1
              AND ($2::TIMESTAMPTZ IS NULL OR (created_at, id) < ($2, $3::UUID))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#
        ))
        .bind(bot_space_id)
        .bind(cutoff)
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn list_since(
        &self,
        bot_space_id: Uuid,
        since: Uuid,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let cutoff = self.message_created_at(bot_space_id, since).await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE bot_space_id = $1 AND (created_at, id) > ($2, $3)
            ORDER BY created_at ASC, id ASC
            LIMIT $4
            "#
        ))
        .bind(bot_space_id)
        .bind(cutoff)
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn spaces_exceeding(&self, cap: usize) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            "SELECT bot_space_id FROM messages GROUP BY bot_space_id HAVING COUNT(*) > $1",
        )
        .bind(cap as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get("bot_space_id").map_err(StoreError::from))
            .collect()
    }

    async fn delete_beyond(&self, bot_space_id: Uuid, keep: usize) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM messages
            WHERE bot_space_id = $1
              AND id NOT IN (
                  SELECT id FROM messages
                  WHERE bot_space_id = $1
                  ORDER BY created_at DESC, id DESC
                  LIMIT $2
              )
            "#,
        )
        .bind(bot_space_id)
        .bind(keep as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BotStore for PgStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Bot>, StoreError> {
        let row = sqlx::query(&format!("SELECT {BOT_COLUMNS} FROM bots WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(bot_from_row).transpose()
    }

    async fn list_by_space(&self, bot_space_id: Uuid) -> Result<Vec<Bot>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOT_COLUMNS} FROM bots WHERE bot_space_id = $1 ORDER BY created_at ASC"
        ))
        .bind(bot_space_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bot_from_row).collect()
    }

    async fn update_last_seen(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE bots SET last_seen_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("bot"));
        }
        Ok(())
    }

    async fn set_manager(&self, id: Uuid, is_manager: bool) -> Result<Bot, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE bots SET is_manager = $2 WHERE id = $1 RETURNING {BOT_COLUMNS}"
        ))
        .bind(id)
        .bind(is_manager)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("bot"))?;

        bot_from_row(&row)
    }

    async fn set_muted(&self, id: Uuid, is_muted: bool) -> Result<Bot, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE bots SET is_muted = $2 WHERE id = $1 RETURNING {BOT_COLUMNS}"
        ))
        .bind(id)
        .bind(is_muted)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("bot"))?;

        bot_from_row(&row)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        // bot_statuses cascades; finished tasks keep their row with bot_id cleared
        let result = sqlx::query("DELETE FROM bots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("bot"));
        }
        Ok(())
    }
}

#[async_trait]
impl MemberStore for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, email, display_name FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(User {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            display_name: row.try_get("display_name")?,
        }))
    }

    async fn is_member(&self, bot_space_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM space_members WHERE bot_space_id = $1 AND user_id = $2) AS member",
        )
        .bind(bot_space_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("member")?)
    }

    async fn is_owner(&self, bot_space_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM space_members
                WHERE bot_space_id = $1 AND user_id = $2 AND role = 'owner'
            ) AS owner
            "#,
        )
        .bind(bot_space_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("owner")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Pool for `TEST_DATABASE_URL`; tests return early when it is unset
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.expect("connect");
        sqlx::migrate!().run(&pool).await.expect("migrate");
        Some(pool)
    }

    async fn seed_space(pool: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO bot_spaces (id, name) VALUES ($1, 'test')")
            .bind(id)
            .execute(pool)
            .await
            .expect("space");
        id
    }

    #[tokio::test]
    async fn test_messages_sharing_a_timestamp_page_once_each() {
        let Some(pool) = test_pool().await else {
            return;
        };
        let store = PgStore::new(pool.clone());
        let space = seed_space(&pool).await;

        // Nanosecond stamp, stored at microsecond precision
        let stamp = Utc::now();
        let mut inserted = Vec::new();
        for i in 0..4 {
            let mut message = Message::new(space, Uuid::new_v4(), "bot", SenderType::Bot, format!("m{i}"));
            message.created_at = stamp;
            inserted.push(MessageStore::insert(&store, &message).await.unwrap());
        }

        let stored = MessageStore::list_by_space(&store, space, 10, None).await.unwrap();
        for row in &inserted {
            let listed = stored.iter().find(|m| m.id == row.id).unwrap();
            assert_eq!(listed.created_at, row.created_at);
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        while let Some(message) = MessageStore::list_by_space(&store, space, 1, cursor).await.unwrap().pop() {
            seen.push(message.id);
            cursor = Some(message.id);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 4);

        let oldest = seen[3];
        let since = store.list_since(space, oldest, 10).await.unwrap();
        let newer: Vec<Uuid> = seen[..3].iter().rev().copied().collect();
        assert_eq!(since.iter().map(|m| m.id).collect::<Vec<_>>(), newer);
    }
}
