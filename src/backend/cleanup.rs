/**
 * clawswarm Message Retention
 *
 * One-shot job: trims every bot space's chat history to the newest
 * `MAX_MESSAGES_PER_SPACE` messages, then exits. Meant to run from cron or a
 * scheduler next to `clawswarm-server`, against the same database.
 */

use clawswarm::backend::messaging::sweep_messages;
use clawswarm::backend::server::config::{build_stores, load_database};
use clawswarm::shared::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::from_env()?;
    if config.database_url.is_none() {
        return Err("DATABASE_URL must be set to run the retention sweep".into());
    }

    let stores = build_stores(load_database(&config).await?);
    let report = sweep_messages(stores.messages.as_ref(), config.max_messages_per_space).await?;
    if report.failed > 0 {
        return Err(format!("{} spaces could not be trimmed", report.failed).into());
    }

    Ok(())
}
