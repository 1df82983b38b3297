//! Config repository: the engine's polling interval.

use std::time::Duration;

use jobs_core::DEFAULT_POLLING_INTERVAL;
use serde::Deserialize;

use crate::{DbError, get_db};

/// Repository for the single `config:engine` record.
pub struct ConfigRepository;

#[derive(Debug, Deserialize)]
struct ConfigRecord {
    polling_interval_ms: i64,
}

/// Resolve a stored interval, falling back to the default for anything unusable.
fn interval_or_default(stored: Result<Option<i64>, DbError>) -> Duration {
    match stored {
        Ok(Some(ms)) if ms > 0 => Duration::from_millis(ms as u64),
        Ok(Some(ms)) => {
            tracing::warn!("Ignoring non-positive polling interval {}ms", ms);
            DEFAULT_POLLING_INTERVAL
        }
        Ok(None) => DEFAULT_POLLING_INTERVAL,
        Err(e) => {
            tracing::warn!("Failed to read polling interval, using default: {}", e);
            DEFAULT_POLLING_INTERVAL
        }
    }
}

impl ConfigRepository {
    /// Current polling interval. Never fails: any problem yields 1000 ms.
    pub async fn polling_interval() -> Duration {
        interval_or_default(Self::stored_interval().await)
    }

    async fn stored_interval() -> Result<Option<i64>, DbError> {
        let db = get_db()?;

        let record: Option<ConfigRecord> = db.select(("config", "engine")).await?;

        Ok(record.map(|r| r.polling_interval_ms))
    }

    /// Store a new polling interval; picked up by the engine on its next tick.
    pub async fn set_polling_interval(ms: u32) -> Result<Duration, DbError> {
        if ms == 0 {
            return Err(DbError::Validation(
                "polling interval must be positive".into(),
            ));
        }
        let db = get_db()?;

        let mut result = db
            .query(
                "UPSERT config:engine SET polling_interval_ms = $ms, updated_at = time::now() RETURN AFTER",
            )
            .bind(("ms", ms as i64))
            .await?;

        let records: Vec<ConfigRecord> = result.take(0)?;

        records
            .into_iter()
            .next()
            .map(|r| Duration::from_millis(r.polling_interval_ms as u64))
            .ok_or_else(|| DbError::Query("Failed to store polling interval".into()))
    }
}
