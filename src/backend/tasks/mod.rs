//! Task Module
//!
//! The task assignment state machine and its HTTP handlers.
//!
//! # Module Structure
//!
//! ```text
//! tasks/
//! ├── mod.rs      - Module exports and documentation
//! ├── machine.rs  - TaskService: transitions, guards and status side effects
//! ├── locks.rs    - Per-(space, bot) async locks
//! └── handlers.rs - HTTP handlers
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! available ──accept/assign──▶ in_progress ──complete──▶ completed
//!                                   │
//!                                   └───────block──────▶ blocked
//! ```
//!
//! A bot holds at most one `in_progress` task per space. The service holds
//! the bot's lock across the check and the write, and the store rejects any
//! write that would still break the rule.

/// Task state machine
pub mod machine;

/// Keyed async locks
pub mod locks;

/// Task HTTP handlers
pub mod handlers;

pub use locks::KeyedLocks;
pub use machine::{NewTask, TaskError, TaskService};
