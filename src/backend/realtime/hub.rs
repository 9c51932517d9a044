/**
 * Room Hub
 *
 * Process-wide registry of live connections, grouped into one room per bot
 * space. Message handlers call `broadcast` after persisting a message; the
 * WebSocket upgrade handler calls `register_connection`.
 *
 * # Locking
 *
 * A single `std::sync::RwLock` guards the bot space -> room map. Nothing
 * awaits while holding it. `broadcast` copies the room under the read lock
 * and enqueues after releasing it, so a slow subscriber never holds up
 * registration or other broadcasts.
 *
 * # Backpressure
 *
 * Enqueues never block. A connection whose queue is full is evicted: it is
 * unregistered, its token is cancelled and its write loop sends a close
 * frame. Clients reconnect and catch up with `/messages/since/{id}`.
 */
use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{Sink, Stream, StreamExt};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use super::connection::{read_loop, write_loop, Connection, ConnectionId};
use crate::shared::HubConfig;

type Room = HashMap<ConnectionId, Arc<Connection>>;

/// Registry of live connections keyed by bot space
#[derive(Clone)]
pub struct Hub {
    rooms: Arc<RwLock<HashMap<Uuid, Room>>>,
    config: HubConfig,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Add a connection to its bot space room, creating the room if needed
    pub fn register(&self, connection: Arc<Connection>) {
        let bot_space_id = connection.bot_space_id();
        let id = connection.id();
        let size = {
            let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
            let room = rooms.entry(bot_space_id).or_default();
            room.insert(id, connection);
            room.len()
        };
        tracing::debug!(
            "[Hub] Registered connection {} in space {} ({} live)",
            id,
            bot_space_id,
            size
        );
    }

    /// Remove a connection and close it
    ///
    /// Returns `true` only for the call that actually removed it; repeated or
    /// concurrent calls for the same connection return `false` and do nothing.
    pub fn unregister(&self, connection: &Connection) -> bool {
        let bot_space_id = connection.bot_space_id();
        let removed = {
            let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
            match rooms.get_mut(&bot_space_id) {
                Some(room) => {
                    let removed = room.remove(&connection.id()).is_some();
                    if room.is_empty() {
                        rooms.remove(&bot_space_id);
                    }
                    removed
                }
                None => false,
            }
        };

        if removed {
            connection.close();
            tracing::debug!(
                "[Hub] Unregistered connection {} from space {}",
                connection.id(),
                bot_space_id
            );
        }
        removed
    }

    /// Deliver `payload` to every connection in the bot space room
    ///
    /// Returns how many connections it was enqueued to. Connections whose
    /// queue is full are evicted.
    pub fn broadcast(&self, bot_space_id: Uuid, payload: Bytes) -> usize {
        let snapshot: Vec<Arc<Connection>> = {
            let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
            match rooms.get(&bot_space_id) {
                Some(room) => room.values().cloned().collect(),
                None => return 0,
            }
        };

        let frame = frame_for(payload);
        let mut delivered = 0;
        let mut evicted = Vec::new();
        for connection in snapshot {
            match connection.try_enqueue(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "[Hub] Evicting slow connection {} in space {}",
                        connection.id(),
                        bot_space_id
                    );
                    evicted.push(connection);
                }
                Err(TrySendError::Closed(_)) => evicted.push(connection),
            }
        }

        for connection in &evicted {
            self.unregister(connection);
        }

        tracing::debug!(
            "[Hub] Broadcast to space {}: {} delivered, {} evicted",
            bot_space_id,
            delivered,
            evicted.len()
        );
        delivered
    }

    /// Register a WebSocket and start its read and write loops
    pub fn register_connection(&self, bot_space_id: Uuid, socket: WebSocket) -> Arc<Connection> {
        let (sink, stream) = socket.split();
        self.attach(bot_space_id, sink, stream)
    }

    /// Register a connection over any transport halves and drive it
    ///
    /// Whichever loop stops first unregisters the connection, which cancels
    /// the other loop.
    pub fn attach<Si, St, E>(&self, bot_space_id: Uuid, sink: Si, stream: St) -> Arc<Connection>
    where
        Si: Sink<Message> + Unpin + Send + 'static,
        Si::Error: StdError + Send + Sync + 'static,
        St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let (connection, queue) = Connection::new(bot_space_id, self.config.send_buffer);
        self.register(connection.clone());

        let hub = self.clone();
        let writer = connection.clone();
        tokio::spawn(async move {
            if let Err(e) = write_loop(sink, queue, writer.closed_token(), hub.config).await {
                tracing::warn!("[Hub] Write loop for connection {} failed: {}", writer.id(), e);
            }
            hub.unregister(&writer);
        });

        let hub = self.clone();
        let reader = connection.clone();
        tokio::spawn(async move {
            if let Err(e) = read_loop(stream, reader.closed_token(), hub.config).await {
                tracing::info!("[Hub] Read loop for connection {} ended: {}", reader.id(), e);
            }
            hub.unregister(&reader);
        });

        connection
    }

    /// Live connections in a bot space room
    pub fn room_size(&self, bot_space_id: Uuid) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(&bot_space_id).map_or(0, HashMap::len)
    }

    /// Number of bot spaces with at least one live connection
    pub fn room_count(&self) -> usize {
        self.rooms.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Text frame for UTF-8 payloads, binary otherwise
fn frame_for(payload: Bytes) -> Message {
    match std::str::from_utf8(&payload) {
        Ok(text) => Message::Text(text.into()),
        Err(_) => Message::Binary(payload),
    }
}
