//! Route Configuration Module
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs        - Module exports and documentation
//! ├── router.rs     - Router assembly and HTTP layers
//! └── api_routes.rs - Tenant-scoped API endpoints
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clawswarm::backend::routes::create_router;
//! use clawswarm::backend::server::AppState;
//! use clawswarm::backend::store::{MemoryStore, Stores};
//! use clawswarm::shared::AppConfig;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::builder().jwt_secret("dev-secret").build()?;
//! let stores = Stores::from_backend(Arc::new(MemoryStore::new()));
//! let router = create_router(AppState::new(config, stores));
//! # Ok(())
//! # }
//! ```

/// Main router creation
pub mod router;

/// API endpoint configuration
pub mod api_routes;

pub use router::create_router;
