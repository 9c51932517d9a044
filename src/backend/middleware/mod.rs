//! Middleware Module
//!
//! HTTP middleware and the access guards handlers apply after it.
//!
//! - **`auth`** - token verification, identity extraction, space, owner and
//!   manager guards, last-seen tracking

pub mod auth;

pub use auth::{
    auth_middleware, require_manager_bot, require_owner, require_space_access, track_last_seen, AuthUser,
};
