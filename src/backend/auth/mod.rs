//! Authentication Module
//!
//! Token handling and caller bookkeeping. Signup, login and password
//! hashing live in a separate service; this server only verifies the tokens
//! it is handed.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs       - Module exports and documentation
//! ├── sessions.rs  - JWT creation and verification
//! └── last_seen.rs - Throttle for bot last-seen writes
//! ```

/// JWT token management
pub mod sessions;

/// Bot last-seen throttling
pub mod last_seen;

pub use last_seen::LastSeenThrottle;
pub use sessions::{create_token, verify_token};
