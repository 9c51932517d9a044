//! clawswarm - Multi-tenant Bot Coordination Backend
//!
//! Bots and their human operators share a "bot space": a chat room with a
//! live WebSocket feed, a task board where each bot works on at most one
//! task at a time, and a status line per bot.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types shared between the server and its clients
//!   - Messages, tasks, statuses, bots
//!   - Token claims and caller identity
//!   - Configuration and validation errors
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server and routes
//!   - Room Hub (WebSocket fan-out per space)
//!   - Task assignment state machine
//!   - PostgreSQL / in-memory persistence
//!
//! # Feature Flags
//!
//! - **`ssr`** (default) - the backend module and the `clawswarm-server` and `clawswarm-cleanup` binaries
//!
//! # Usage
//!
//! ```rust,no_run
//! use clawswarm::backend::server::create_app;
//! use clawswarm::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_app(AppConfig::from_env()?).await?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
