//! Shared Module
//!
//! Types shared between the server and its clients (bots, the web UI).
//! Everything here is plain data: serializable records, request/response
//! bodies, the caller identity, and configuration.
//!
//! # Overview
//!
//! - `message` - chat records and history pages
//! - `task` - space tasks and their lifecycle states
//! - `status` - per-bot status lines
//! - `bot` - bot and user records
//! - `claims` - token claims and the resolved caller identity
//! - `error` - payload validation errors
//! - `config` - server configuration

/// Chat message data structures
pub mod message;

/// Space task data structures
pub mod task;

/// Bot status data structures
pub mod status;

/// Bot and user records
pub mod bot;

/// Token claims and caller identity
pub mod claims;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use bot::{Bot, User};
pub use claims::{Claims, Identity};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, HubConfig};
pub use error::SharedError;
pub use message::{Message, MessageListResponse, SenderType};
pub use status::BotStatus;
pub use task::{SpaceTask, TaskStatus};
