//! Backend Module
//!
//! All server-side code for the clawswarm coordination backend: the Axum
//! HTTP server, the Room Hub that fans chat messages out to live WebSocket
//! connections, and the task state machine that hands work to bots.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, database loading
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`realtime`** - Room Hub and WebSocket subscription
//! - **`tasks`** - Task assignment state machine and handlers
//! - **`messaging`** - Message post, history and catch-up handlers
//! - **`statuses`** - Bot status handlers
//! - **`bots`** - Bot directory and owner controls
//! - **`store`** - Persistence traits, PostgreSQL and in-memory backends
//! - **`auth`** - Token issuing/verification, last-seen throttle
//! - **`middleware`** - Identity extraction and access guards
//! - **`error`** - Backend error type and HTTP mapping
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs       - Module exports and documentation
//! ├── server/      - Server initialization and state
//! ├── routes/      - Route configuration
//! ├── realtime/    - Room Hub
//! ├── tasks/       - Task state machine
//! ├── messaging/   - Chat messages
//! ├── statuses/    - Bot statuses
//! ├── bots/        - Bot directory
//! ├── store/       - Persistence
//! ├── auth/        - Tokens and last-seen
//! ├── middleware/  - Request middleware
//! └── error/       - Error types
//! ```
//!
//! # Tenancy
//!
//! Every route is scoped by a bot space. Bots may only touch their own
//! space; human users must be members of it. Nothing crosses spaces: not
//! broadcasts, not task lookups, not status lines.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Real-time fan-out
pub mod realtime;

/// Task assignment
pub mod tasks;

/// Chat messages
pub mod messaging;

/// Bot status lines
pub mod statuses;

/// Bot directory
pub mod bots;

/// Persistence
pub mod store;

/// Authentication
pub mod auth;

/// Middleware for request processing
pub mod middleware;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use error::BackendError;
pub use realtime::Hub;
pub use server::{create_app, AppState};
pub use tasks::TaskService;
