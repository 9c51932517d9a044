//! Common test utilities and helpers
//!
//! - A seeded in-memory bot space (manager, workers, a human owner and member)
//! - Token helpers for the HTTP tests
//! - In-process transport halves for driving hub connections

#![allow(dead_code)]

use axum::extract::ws::Message as Frame;
use futures_util::{SinkExt, Stream};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::{PollSendError, PollSender};
use uuid::Uuid;

use clawswarm::backend::auth::create_token;
use clawswarm::backend::server::AppState;
use clawswarm::backend::store::{MemoryStore, Stores};
use clawswarm::backend::tasks::TaskService;
use clawswarm::shared::{AppConfig, Bot, Identity, User};

pub const TEST_SECRET: &str = "test-secret";

pub fn test_config() -> AppConfig {
    AppConfig::builder()
        .jwt_secret(TEST_SECRET)
        .max_messages_per_page(5)
        .max_message_length(64)
        .build()
        .expect("valid test config")
}

/// One bot space with a manager, some workers, its owner and a human member
pub struct TestSpace {
    pub id: Uuid,
    pub store: Arc<MemoryStore>,
    pub manager: Bot,
    pub workers: Vec<Bot>,
    pub owner: User,
    pub member: User,
}

impl TestSpace {
    pub async fn seed(workers: usize) -> Self {
        Self::seed_into(Arc::new(MemoryStore::new()), workers).await
    }

    /// Seed another space into an existing store
    pub async fn seed_into(store: Arc<MemoryStore>, workers: usize) -> Self {
        let id = Uuid::new_v4();
        let manager = Bot::new(id, "manager", true);
        store.add_bot(manager.clone()).await;

        let mut bots = Vec::with_capacity(workers);
        for i in 0..workers {
            let bot = Bot::new(id, format!("worker-{i}"), false);
            store.add_bot(bot.clone()).await;
            bots.push(bot);
        }

        let member = User {
            id: Uuid::new_v4(),
            email: format!("ops-{id}@example.com"),
            display_name: Some("Ops".to_string()),
        };
        store.add_member(id, member.clone()).await;

        let owner = User {
            id: Uuid::new_v4(),
            email: format!("owner-{id}@example.com"),
            display_name: None,
        };
        store.add_owner(id, owner.clone()).await;

        Self {
            id,
            store,
            manager,
            workers: bots,
            owner,
            member,
        }
    }

    pub fn stores(&self) -> Stores {
        Stores::from_backend(self.store.clone())
    }

    pub fn task_service(&self) -> Arc<TaskService> {
        Arc::new(TaskService::new(&self.stores()))
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(test_config(), self.stores())
    }

    pub fn manager_identity(&self) -> Identity {
        bot_identity(&self.manager)
    }

    pub fn worker_identity(&self, i: usize) -> Identity {
        bot_identity(&self.workers[i])
    }

    pub fn member_identity(&self) -> Identity {
        Identity::user(self.member.id)
    }

    pub fn owner_identity(&self) -> Identity {
        Identity::user(self.owner.id)
    }
}

pub fn bot_identity(bot: &Bot) -> Identity {
    Identity::bot(bot.bot_space_id, bot.id, bot.is_manager)
}

/// Signed token for `identity` under the test secret
pub fn token_for(identity: &Identity) -> String {
    create_token(identity, TEST_SECRET, Duration::from_secs(3600)).expect("token")
}

/// Create authorization header value
pub fn auth_header(identity: &Identity) -> String {
    format!("Bearer {}", token_for(identity))
}

pub type TestSink = futures_util::sink::SinkMapErr<PollSender<Frame>, fn(PollSendError<Frame>) -> std::io::Error>;

fn broken_pipe(_: PollSendError<Frame>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "peer gone")
}

/// Outbound half whose frames land in the returned receiver
pub fn channel_sink(capacity: usize) -> (TestSink, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel(capacity);
    (PollSender::new(tx).sink_map_err(broken_pipe as fn(_) -> _), rx)
}

pub type TestStream = Pin<Box<dyn Stream<Item = Result<Frame, std::io::Error>> + Send>>;

/// Inbound half fed by the returned sender
pub fn channel_stream() -> (mpsc::Sender<Result<Frame, std::io::Error>>, TestStream) {
    let (tx, rx) = mpsc::channel(16);
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    });
    (tx, Box::pin(stream))
}

/// Next frame written to a test sink, failing after one second
pub async fn next_frame(rx: &mut mpsc::Receiver<Frame>) -> Frame {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("frame within timeout")
        .expect("sink still open")
}
