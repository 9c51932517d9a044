//! Bot Status Module
//!
//! Read and manager-write endpoints for per-bot status lines.

pub mod handlers;

pub use handlers::{bulk_update_statuses, get_status, list_statuses, update_status};
