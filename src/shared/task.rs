//! Space Task Types
//!
//! A task is a unit of work inside a bot space. Its lifecycle is
//! `available -> in_progress -> completed | blocked`, and a bot may hold at
//! most one `in_progress` task per space at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Available,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    /// Database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Available => "available",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        }
    }

    /// Parse the database / query-string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(TaskStatus::Available),
            "in_progress" => Some(TaskStatus::InProgress),
            "completed" => Some(TaskStatus::Completed),
            "blocked" => Some(TaskStatus::Blocked),
            _ => None,
        }
    }

    /// `completed` and `blocked` have no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Blocked)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tenant-scoped unit of work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpaceTask {
    pub id: Uuid,
    pub bot_space_id: Uuid,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    /// Assigned bot; set on entering `in_progress` and kept afterwards
    pub bot_id: Option<Uuid>,
    pub created_by_bot_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpaceTask {
    /// Create an unassigned task in `available`
    pub fn new(
        bot_space_id: Uuid,
        name: impl Into<String>,
        description: impl Into<String>,
        created_by_bot_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            bot_space_id,
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Available,
            bot_id: None,
            created_by_bot_id,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `bot_id` is the bot currently working this task
    pub fn is_assigned_to(&self, bot_id: Uuid) -> bool {
        self.bot_id == Some(bot_id)
    }

    /// Status line shown for the assigned bot while it works this task
    pub fn working_status(&self) -> String {
        format!("Working on {}", self.name)
    }
}

/// Body of `POST /tasks`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpaceTaskRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Assign immediately to this bot
    #[serde(default)]
    pub bot_id: Option<Uuid>,
}

impl CreateSpaceTaskRequest {
    pub fn validate(&self) -> Result<(), SharedError> {
        if self.name.trim().is_empty() {
            return Err(SharedError::validation("name", "task name must not be empty"));
        }
        Ok(())
    }
}

/// Body of `POST /tasks/{taskId}/assign`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    pub bot_id: Uuid,
}

/// Query parameters of `GET /tasks`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            TaskStatus::Available,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Blocked,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("done"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Blocked.is_terminal());
        assert!(!TaskStatus::Available.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_new_task_is_available_and_unassigned() {
        let manager = Uuid::new_v4();
        let task = SpaceTask::new(Uuid::new_v4(), "index docs", "", manager);
        assert_eq!(task.status, TaskStatus::Available);
        assert!(task.bot_id.is_none());
        assert_eq!(task.created_by_bot_id, manager);
        assert_eq!(task.working_status(), "Working on index docs");
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateSpaceTaskRequest = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(req.description, "");
        assert!(req.bot_id.is_none());
        assert!(req.validate().is_ok());

        let blank: CreateSpaceTaskRequest = serde_json::from_str(r#"{"name":" "}"#).unwrap();
        assert!(blank.validate().is_err());
    }
}
