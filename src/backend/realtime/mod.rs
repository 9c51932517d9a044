//! Real-time Module
//!
//! The Room Hub: one room of live WebSocket connections per bot space, fed
//! by the message post handler.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs          - Module exports and documentation
//! ├── hub.rs          - Registry, broadcast and eviction
//! ├── connection.rs   - Per-connection queue and read/write loops
//! └── subscription.rs - WebSocket upgrade handler
//! ```
//!
//! # Delivery
//!
//! Broadcast is fire-and-forget. A connection that falls behind is evicted
//! rather than slowing anyone down; the client reconnects and pulls what it
//! missed from the history endpoints. Per connection, frames arrive in the
//! order they were broadcast.

/// Room registry and broadcast
pub mod hub;

/// Live connection and its transport loops
pub mod connection;

/// WebSocket subscription handler
pub mod subscription;

pub use connection::{Connection, ConnectionId, TransportError};
pub use hub::Hub;
pub use subscription::handle_room_subscription;
