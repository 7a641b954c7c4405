use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Shard pool URLs, used only when `sharding_enabled`. Empty means a
    /// single shard backed by `database_url`.
    pub database_shard_urls: Vec<String>,
    pub redis_url: String,
    pub kafka_brokers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub port: u16,

    /// Per-reader cap on materialized timeline entries.
    pub timeline_max_size: i64,
    pub timeline_default_page_size: i64,
    pub timeline_max_page_size: i64,
    /// Authors with strictly more followers than this are read on demand
    /// instead of fanned out.
    pub celebrity_follower_threshold: i64,

    pub outbox_poll_interval_ms: u64,
    pub outbox_batch_size: i64,
    pub outbox_retention_hours: i64,

    pub sharding_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_shard_urls: env::var("DATABASE_SHARD_URLS")
                .map(|v| parse_shard_urls(&v))
                .unwrap_or_default(),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            kafka_brokers: env::var("KAFKA_BROKERS")
                .unwrap_or_else(|_| "localhost:9092".to_string()),
            kafka_topic: env::var("KAFKA_TOPIC")
                .unwrap_or_else(|_| "timeline-events".to_string()),
            kafka_group_id: env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| "timeline-materializer".to_string()),
            port: parse_env("PORT", 8080)?,

            timeline_max_size: parse_env("TIMELINE_MAX_SIZE", 800)?,
            timeline_default_page_size: parse_env("TIMELINE_DEFAULT_PAGE_SIZE", 20)?,
            timeline_max_page_size: parse_env("TIMELINE_MAX_PAGE_SIZE", 100)?,
            celebrity_follower_threshold: parse_env("CELEBRITY_FOLLOWER_THRESHOLD", 10_000)?,

            outbox_poll_interval_ms: parse_env("OUTBOX_POLL_INTERVAL_MS", 1000)?,
            outbox_batch_size: parse_env("OUTBOX_BATCH_SIZE", 100)?,
            outbox_retention_hours: parse_env("OUTBOX_RETENTION_HOURS", 24)?,

            sharding_enabled: parse_env("SHARDING_ENABLED", false)?,
        })
    }

    /// Dispatcher knobs derived from the outbox settings.
    pub fn dispatcher_config(&self) -> txoutbox::DispatcherConfig {
        txoutbox::DispatcherConfig {
            poll_interval: Duration::from_millis(self.outbox_poll_interval_ms),
            batch_size: self.outbox_batch_size,
            retention: Duration::from_secs(self.outbox_retention_hours as u64 * 3600),
            ..txoutbox::DispatcherConfig::default()
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be valid: {e}")),
        Err(_) => Ok(default),
    }
}

fn parse_shard_urls(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
