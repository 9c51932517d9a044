//! Application configuration module
//!
//! `AppConfig` holds every tunable of the server. It is assembled with
//! `AppConfigBuilder`, either by hand (tests) or from environment variables
//! via [`AppConfig::from_env`].

use std::time::Duration;
use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port the HTTP server binds to
    pub server_port: u16,
    /// PostgreSQL URL; `None` selects the in-memory store
    pub database_url: Option<String>,
    /// HMAC secret used to verify bearer tokens
    pub jwt_secret: String,
    /// Lifetime of tokens issued by `create_token`
    pub jwt_expiration: Duration,
    pub max_messages_per_page: usize,
    pub max_message_length: usize,
    /// History kept per space by the retention sweep
    pub max_messages_per_space: usize,
    pub hub: HubConfig,
    /// Minimum time between two `last_seen_at` writes for the same bot
    pub last_seen_interval: Duration,
}

/// Live connection tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue
    pub send_buffer: usize,
    /// Deadline for a single transport write
    pub write_wait: Duration,
    /// Silence after which the peer is considered dead
    pub pong_wait: Duration,
    /// Interval between keepalive pings
    pub ping_period: Duration,
    /// Largest inbound frame accepted from a client
    pub max_frame_bytes: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_buffer: 256,
            write_wait: Duration::from_secs(10),
            pong_wait: Duration::from_secs(60),
            ping_period: Duration::from_secs(30),
            max_frame_bytes: 512,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3000,
            database_url: None,
            jwt_secret: String::new(),
            jwt_expiration: Duration::from_secs(24 * 60 * 60),
            max_messages_per_page: 30,
            max_message_length: 10_000,
            max_messages_per_space: 1_000,
            hub: HubConfig::default(),
            last_seen_interval: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables fall back to the defaults; `JWT_SECRET` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = AppConfig::builder();

        if let Some(port) = env_parse::<u16>("SERVER_PORT")? {
            builder = builder.server_port(port);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                builder = builder.database_url(url);
            }
        }
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingValue("JWT_SECRET"))?;
        builder = builder.jwt_secret(secret);
        if let Some(secs) = env_parse::<u64>("JWT_EXPIRATION_SECS")? {
            builder = builder.jwt_expiration(Duration::from_secs(secs));
        }
        if let Some(n) = env_parse::<usize>("MAX_MESSAGES_PER_PAGE")? {
            builder = builder.max_messages_per_page(n);
        }
        if let Some(n) = env_parse::<usize>("MAX_MESSAGE_LENGTH")? {
            builder = builder.max_message_length(n);
        }
        if let Some(n) = env_parse::<usize>("MAX_MESSAGES_PER_SPACE")? {
            builder = builder.max_messages_per_space(n);
        }

        let mut hub = HubConfig::default();
        if let Some(n) = env_parse::<usize>("WS_SEND_BUFFER")? {
            hub.send_buffer = n;
        }
        if let Some(secs) = env_parse::<u64>("WS_WRITE_WAIT_SECS")? {
            hub.write_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("WS_PONG_WAIT_SECS")? {
            hub.pong_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<u64>("WS_PING_PERIOD_SECS")? {
            hub.ping_period = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("WS_MAX_FRAME_BYTES")? {
            hub.max_frame_bytes = n;
        }
        builder = builder.hub(hub);

        if let Some(secs) = env_parse::<u64>("LAST_SEEN_INTERVAL_SECS")? {
            builder = builder.last_seen_interval(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }
        if self.max_messages_per_page == 0 {
            return Err(ConfigError::InvalidValue {
                key: "MAX_MESSAGES_PER_PAGE",
                reason: "must be greater than zero".to_string(),
            });
        }
        let zero_checks = [
            ("MAX_MESSAGES_PER_SPACE", self.max_messages_per_space == 0),
            ("WS_SEND_BUFFER", self.hub.send_buffer == 0),
            ("WS_MAX_FRAME_BYTES", self.hub.max_frame_bytes == 0),
            ("WS_WRITE_WAIT_SECS", self.hub.write_wait.is_zero()),
            ("WS_PONG_WAIT_SECS", self.hub.pong_wait.is_zero()),
            // tokio intervals panic on a zero period
            ("WS_PING_PERIOD_SECS", self.hub.ping_period.is_zero()),
        ];
        if let Some((key, _)) = zero_checks.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::InvalidValue {
                key,
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.hub.ping_period >= self.hub.pong_wait {
            return Err(ConfigError::InvalidValue {
                key: "WS_PING_PERIOD_SECS",
                reason: "must be shorter than WS_PONG_WAIT_SECS".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key,
                reason: format!("cannot parse {raw:?}"),
            }),
        _ => Ok(None),
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn jwt_expiration(mut self, expiration: Duration) -> Self {
        self.config.jwt_expiration = expiration;
        self
    }

    pub fn max_messages_per_page(mut self, n: usize) -> Self {
        self.config.max_messages_per_page = n;
        self
    }

    pub fn max_message_length(mut self, n: usize) -> Self {
        self.config.max_message_length = n;
        self
    }

    pub fn max_messages_per_space(mut self, n: usize) -> Self {
        self.config.max_messages_per_space = n;
        self
    }

    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.config.hub = hub;
        self
    }

    pub fn last_seen_interval(mut self, interval: Duration) -> Self {
        self.config.last_seen_interval = interval;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
