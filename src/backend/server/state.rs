/**
 * Application State Management
 *
 * `AppState` is the single state value handed to the router. It is cheap to
 * clone: every field is an `Arc` or wraps one.
 *
 * # State Extraction
 *
 * The `FromRef` implementations let handlers take only the part they need,
 * e.g. `State(hub): State<Hub>`.
 */

use axum::extract::FromRef;
use std::sync::Arc;

use crate::backend::auth::LastSeenThrottle;
use crate::backend::realtime::Hub;
use crate::backend::store::Stores;
use crate::backend::tasks::TaskService;
use crate::shared::AppConfig;

/// Central state container for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub stores: Stores,
    /// Live subscribers grouped by bot space
    pub hub: Hub,
    pub tasks: Arc<TaskService>,
    pub last_seen: Arc<LastSeenThrottle>,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        let hub = Hub::new(config.hub);
        let tasks = Arc::new(TaskService::new(&stores));
        let last_seen = Arc::new(LastSeenThrottle::new(config.last_seen_interval));
        Self {
            config: Arc::new(config),
            stores,
            hub,
            tasks,
            last_seen,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Stores {
    fn from_ref(state: &AppState) -> Self {
        state.stores.clone()
    }
}

impl FromRef<AppState> for Hub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

impl FromRef<AppState> for Arc<TaskService> {
    fn from_ref(state: &AppState) -> Self {
        state.tasks.clone()
    }
}
