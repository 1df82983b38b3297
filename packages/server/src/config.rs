//! Server configuration from CLI flags and environment variables.
//!
//! ```bash
//! jobs-server --bind 0.0.0.0:3000 --workers 8 --polling-interval-ms 500
//! DATABASE_URL=rocksdb://./data WORKERS=8 jobs-server
//! ```

use std::time::Duration;

use clap::Parser;
use db::DbConfig;
use jobs_core::EngineConfig;

#[derive(Debug, Clone, Parser)]
#[command(name = "jobs-server")]
#[command(about = "Accepts integer jobs over HTTP and processes them in the background")]
#[command(version)]
pub struct Config {
    /// SurrealDB endpoint: mem://, rocksdb://path, ws://host:port
    #[arg(long, default_value = "mem://", env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, default_value = "jobs", env = "DATABASE_NS")]
    pub namespace: String,

    #[arg(long, default_value = "main", env = "DATABASE_DB")]
    pub database: String,

    /// Root user, for remote endpoints
    #[arg(long, env = "DATABASE_USER", requires = "db_pass")]
    pub db_user: Option<String>,

    #[arg(long, env = "DATABASE_PASS", requires = "db_user")]
    pub db_pass: Option<String>,

    /// Address the HTTP gateway listens on
    #[arg(long, default_value = "0.0.0.0:3000", env = "BIND_ADDR")]
    pub bind: String,

    /// Requests per second per client IP, 0 disables the limit
    #[arg(long, default_value = "1000", env = "RATE_LIMIT")]
    pub rate_limit: u32,

    // === Engine ===
    /// Worker actors per engine
    #[arg(long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Jobs claimed per tick
    #[arg(long, default_value = "32", env = "CLAIM_BATCH")]
    pub claim_batch: usize,

    /// Claims before a job is forced to ERROR
    #[arg(long, default_value = "5", env = "MAX_ATTEMPTS")]
    pub max_attempts: u32,

    /// Seconds after which a claim is released back to PENDING
    #[arg(long, default_value = "300", env = "STALE_CLAIM_SECS")]
    pub stale_claim_secs: u64,

    /// Polling interval written to the config store at start-up
    #[arg(long, env = "POLLING_INTERVAL_MS")]
    pub polling_interval_ms: Option<u32>,
}

impl Config {
    pub fn db_config(&self) -> DbConfig {
        let config = DbConfig::endpoint(&self.database_url)
            .with_namespace(&self.namespace)
            .with_database(&self.database);

        match (&self.db_user, &self.db_pass) {
            (Some(user), Some(pass)) => config.with_credentials(user, pass),
            _ => config,
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_workers(self.workers)
            .with_claim_batch(self.claim_batch)
            .with_max_attempts(self.max_attempts)
            .with_stale_claim_after(Duration::from_secs(self.stale_claim_secs))
    }
}
