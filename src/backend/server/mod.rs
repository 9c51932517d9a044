//! Server Module
//!
//! Initialization and configuration of the Axum HTTP server.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs    - Module exports and documentation
//! ├── state.rs  - AppState and FromRef implementations
//! ├── config.rs - Database loading and store selection
//! └── init.rs   - App creation and background maintenance
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use clawswarm::backend::server::create_app;
//! use clawswarm::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::from_env()?;
//! let app = create_app(config).await?;
//! # Ok(())
//! # }
//! ```

/// Application state management
pub mod state;

/// Database loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::StartupError;
pub use init::create_app;
pub use state::AppState;
