/**
 * Live Connection
 *
 * One subscriber of a bot space room. A connection owns a bounded outbound
 * queue that the hub fills with non-blocking enqueues, and a cancellation
 * token the hub cancels when the connection is removed from its room.
 *
 * Two loops drive the transport:
 *
 * - `write_loop` drains the queue into the sink in arrival order, pings on a
 *   fixed period and bounds every write by `write_wait`
 * - `read_loop` only watches for liveness; any frame refreshes the
 *   `pong_wait` deadline and oversized frames end the connection
 *
 * Both loops return when the token is cancelled, so tearing down one side
 * tears down the other.
 */
use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::shared::HubConfig;

pub type ConnectionId = Uuid;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Why a connection loop stopped
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("write did not complete within the deadline")]
    WriteTimeout,

    #[error("no frame received within the deadline")]
    ReadTimeout,

    #[error("inbound frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("transport error: {0}")]
    Transport(#[source] BoxError),
}

/// A subscriber scoped to one bot space for its whole lifetime
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    bot_space_id: Uuid,
    queue: mpsc::Sender<Message>,
    closed: CancellationToken,
}

impl Connection {
    /// Create a connection and the receiving half of its outbound queue
    pub fn new(bot_space_id: Uuid, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (queue, receiver) = mpsc::channel(capacity);
        let connection = Self {
            id: Uuid::new_v4(),
            bot_space_id,
            queue,
            closed: CancellationToken::new(),
        };
        (Arc::new(connection), receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn bot_space_id(&self) -> Uuid {
        self.bot_space_id
    }

    /// Non-blocking enqueue; fails when the queue is full or the loop is gone
    pub(crate) fn try_enqueue(&self, frame: Message) -> Result<(), mpsc::error::TrySendError<Message>> {
        self.queue.try_send(frame)
    }

    /// Token cancelled once the connection leaves its room
    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Only the hub calls this, and only from the unregister that removed it
    pub(crate) fn close(&self) {
        self.closed.cancel();
    }
}

fn transport<E>(err: E) -> TransportError
where
    E: StdError + Send + Sync + 'static,
{
    TransportError::Transport(Box::new(err))
}

async fn send_with_deadline<S>(
    sink: &mut S,
    frame: Message,
    config: &HubConfig,
) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: StdError + Send + Sync + 'static,
{
    match timeout(config.write_wait, sink.send(frame)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(transport(e)),
        Err(_) => Err(TransportError::WriteTimeout),
    }
}

/// Drain the outbound queue into `sink` until cancelled or a write fails
pub async fn write_loop<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<Message>,
    closed: CancellationToken,
    config: HubConfig,
) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: StdError + Send + Sync + 'static,
{
    let mut ping = interval_at(Instant::now() + config.ping_period, config.ping_period);

    loop {
        tokio::select! {
            // Close wins over pending payloads
            biased;
            _ = closed.cancelled() => {
                // Best effort; the peer may already be gone
                let _ = timeout(config.write_wait, sink.send(Message::Close(None))).await;
                return Ok(());
            }
            frame = queue.recv() => match frame {
                Some(frame) => send_with_deadline(&mut sink, frame, &config).await?,
                None => {
                    let _ = timeout(config.write_wait, sink.send(Message::Close(None))).await;
                    return Ok(());
                }
            },
            _ = ping.tick() => {
                send_with_deadline(&mut sink, Message::Ping(Default::default()), &config).await?;
            }
        }
    }
}

fn frame_size(frame: &Message) -> usize {
    match frame {
        Message::Text(text) => text.as_str().len(),
        Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => data.len(),
        Message::Close(_) => 0,
    }
}

/// Watch the inbound half for liveness until cancelled, closed or failed
///
/// Returns `Ok(())` on a clean close from either side.
pub async fn read_loop<S, E>(
    mut stream: S,
    closed: CancellationToken,
    config: HubConfig,
) -> Result<(), TransportError>
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: StdError + Send + Sync + 'static,
{
    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => return Ok(()),
            next = timeout(config.pong_wait, stream.next()) => next,
        };

        match next {
            Err(_) => return Err(TransportError::ReadTimeout),
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => return Ok(()),
            Ok(Some(Err(e))) => return Err(transport(e)),
            Ok(Some(Ok(frame))) => {
                let size = frame_size(&frame);
                if size > config.max_frame_bytes {
                    return Err(TransportError::FrameTooLarge {
                        size,
                        max: config.max_frame_bytes,
                    });
                }
                // Clients never send anything meaningful; the frame only
                // proves the peer is alive
            }
        }
    }
}
