/**
 * Server Initialization
 *
 * Builds the application from an `AppConfig`:
 *
 * 1. Load the database (in-memory store when no URL is configured)
 * 2. Create `AppState` (hub, task service, last-seen throttle)
 * 3. Create the router
 * 4. Start the periodic maintenance task
 */

use axum::Router;
use std::time::{Duration, Instant};

use crate::backend::routes::router::create_router;
use crate::backend::server::config::{build_stores, load_database, StartupError};
use crate::backend::server::state::AppState;
use crate::shared::AppConfig;

/// How often stale throttle entries and idle task locks are dropped
const MAINTENANCE_PERIOD: Duration = Duration::from_secs(300);

/// Create and configure the Axum application
pub async fn create_app(config: AppConfig) -> Result<Router<()>, StartupError> {
    tracing::info!("Initializing clawswarm backend server");

    let pool = load_database(&config).await?;
    let app_state = AppState::new(config, build_stores(pool));
    let app = create_router(app_state.clone());

    spawn_maintenance(app_state);
    tracing::info!("Router configured with periodic maintenance task");

    Ok(app)
}

fn spawn_maintenance(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(MAINTENANCE_PERIOD);
        loop {
            interval.tick().await;
            state.last_seen.prune(Instant::now());
            state.tasks.locks().prune();
            tracing::debug!(
                "[Server] Maintenance: {} throttle entries, {} task locks, {} live rooms",
                state.last_seen.len(),
                state.tasks.locks().len(),
                state.hub.room_count()
            );
        }
    });
}
