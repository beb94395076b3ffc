use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::game_manager::ManagerTimeouts;
use crate::websocket::RateLimit;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth_dev_mode: bool,
    pub jwt_secret: Option<String>,
    pub queue_timeout_seconds: u64,
    pub game_timeout_minutes: u64,
    pub connection_timeout_seconds: u64,
    pub ai_timeout_millis: u64,
    pub store_timeout_millis: u64,
    pub stats_snapshot_path: String,
    pub retry_interval_seconds: u64,
    pub rate_limit_burst: u32,
    pub rate_limit_refill_millis: u64,
}

/// Reads `key`, falling back to `default` when unset or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {} value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8080),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://grid_arena.db?mode=rwc".to_string()),
            auth_dev_mode: env_or("AUTH_DEV_MODE", false),
            jwt_secret: env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            queue_timeout_seconds: env_or("QUEUE_TIMEOUT_SECONDS", 300),
            game_timeout_minutes: env_or("GAME_TIMEOUT_MINUTES", 120),
            connection_timeout_seconds: env_or("CONNECTION_TIMEOUT_SECONDS", 300),
            ai_timeout_millis: env_or("AI_TIMEOUT_MILLIS", 2000),
            store_timeout_millis: env_or("STORE_TIMEOUT_MILLIS", 3000),
            stats_snapshot_path: env::var("STATS_SNAPSHOT_PATH")
                .unwrap_or_else(|_| "./data/stats_snapshot.json".to_string()),
            retry_interval_seconds: env_or("RETRY_INTERVAL_SECONDS", 30),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", 20),
            rate_limit_refill_millis: env_or("RATE_LIMIT_REFILL_MILLIS", 100),
        }
    }

    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_seconds)
    }

    pub fn game_timeout(&self) -> Duration {
        Duration::from_secs(self.game_timeout_minutes * 60)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn manager_timeouts(&self) -> ManagerTimeouts {
        ManagerTimeouts {
            ai: Duration::from_millis(self.ai_timeout_millis),
            store: Duration::from_millis(self.store_timeout_millis.max(1)),
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_seconds.max(1))
    }

    pub fn rate_limit(&self) -> RateLimit {
        RateLimit {
            burst: self.rate_limit_burst.max(1),
            refill: Duration::from_millis(self.rate_limit_refill_millis),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
