//! Messaging Module
//!
//! Chat history endpoints, the post handler that feeds the Room Hub, and the
//! retention sweep that caps each space's history.

pub mod handlers;
pub mod retention;

pub use handlers::{list_messages, messages_since, post_message};
pub use retention::{sweep_messages, SweepReport};
