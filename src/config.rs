//! Server configuration from flags and environment variables

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::webhook::DispatcherConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "fulfillment")]
#[command(about = "Request, bid and project broker with webhook notifications")]
#[command(version)]
pub struct Config {
    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:fulfillment.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub database_max_connections: u32,

    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:4000")]
    pub bind_addr: SocketAddr,

    /// Per-attempt webhook timeout in seconds
    #[arg(long, env = "WEBHOOK_TIMEOUT_SECS", default_value_t = 10)]
    pub webhook_timeout_secs: u64,

    #[arg(long, env = "WEBHOOK_MAX_ATTEMPTS", default_value_t = 3)]
    pub webhook_max_attempts: i64,

    /// Records handled per sweep query
    #[arg(long, env = "WEBHOOK_RETRY_BATCH", default_value_t = 100)]
    pub webhook_retry_batch: i64,

    #[arg(long, env = "WEBHOOK_CONCURRENCY", default_value_t = 8)]
    pub webhook_concurrency: usize,

    /// Period of the in-process retry sweep; 0 leaves retries to an external trigger
    #[arg(long, env = "WEBHOOK_RETRY_INTERVAL_SECS", default_value_t = 0)]
    pub webhook_retry_interval_secs: u64,
}

impl Config {
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            timeout: Duration::from_secs(self.webhook_timeout_secs.max(1)),
            max_attempts: self.webhook_max_attempts.max(1),
            batch_size: self.webhook_retry_batch.max(1),
            concurrency: self.webhook_concurrency.max(1),
            deliver_on_enqueue: true,
        }
    }

    pub fn retry_interval(&self) -> Option<Duration> {
        (self.webhook_retry_interval_secs > 0)
            .then(|| Duration::from_secs(self.webhook_retry_interval_secs))
    }
}
