//! Worker engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Polling interval used when the config store has no usable value.
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_millis(1000);

/// Shortest claim age [`EngineConfig::with_stale_claim_after`] accepts.
/// Anything shorter would release claims other engines are still working on.
pub const MIN_STALE_CLAIM_AFTER: Duration = Duration::from_secs(1);

/// Tuning for the dispatcher and its worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker actors processing claimed jobs.
    pub workers: usize,
    /// Maximum jobs claimed per tick.
    pub claim_batch: usize,
    /// Claims allowed before a job is forced to `ERROR`.
    pub max_attempts: u32,
    /// Claims older than this are released back to `PENDING`.
    #[serde(with = "millis")]
    pub stale_claim_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            claim_batch: 32,
            max_attempts: 5,
            stale_claim_after: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_claim_batch(mut self, claim_batch: usize) -> Self {
        self.claim_batch = claim_batch.max(1);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_stale_claim_after(mut self, after: Duration) -> Self {
        self.stale_claim_after = after.max(MIN_STALE_CLAIM_AFTER);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
