//! Table definitions for the job and config stores.

use crate::{DbError, get_db};

/// Define the `job` and `config` tables. Safe to run on every start.
pub async fn init_schema() -> Result<(), DbError> {
    let db = get_db()?;

    for (table, schema) in [("job", JOB_SCHEMA), ("config", CONFIG_SCHEMA)] {
        db.query(schema).await?.check()?;
        tracing::debug!("Applied schema for table {}", table);
    }

    tracing::info!("Database schema ready");

    Ok(())
}

/// Job table schema.
const JOB_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS job SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS job_id ON job TYPE string READONLY;
DEFINE FIELD IF NOT EXISTS status ON job TYPE string DEFAULT "PENDING"
    ASSERT $value IN ["PENDING", "CLAIMED", "PROCESSED", "ERROR"];
DEFINE FIELD IF NOT EXISTS data ON job TYPE array<int> READONLY;
DEFINE FIELD IF NOT EXISTS action ON job TYPE string READONLY
    ASSERT string::len(string::trim($value)) > 0;
DEFINE FIELD IF NOT EXISTS result ON job TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS attempts ON job TYPE int DEFAULT 0;
DEFINE FIELD IF NOT EXISTS owner ON job TYPE option<string>;
DEFINE FIELD IF NOT EXISTS claimed_at ON job TYPE option<datetime>;
DEFINE FIELD IF NOT EXISTS created_at ON job TYPE datetime DEFAULT time::now() READONLY;
DEFINE FIELD IF NOT EXISTS updated_at ON job TYPE datetime DEFAULT time::now();

DEFINE INDEX IF NOT EXISTS job_public_id ON job FIELDS job_id UNIQUE;
DEFINE INDEX IF NOT EXISTS job_status ON job FIELDS status;
DEFINE INDEX IF NOT EXISTS job_created ON job FIELDS created_at;

-- Claim path: oldest pending first
DEFINE INDEX IF NOT EXISTS job_status_created ON job FIELDS status, created_at;
"#;

/// Engine configuration table, a single `config:engine` record.
const CONFIG_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS config SCHEMAFULL;

DEFINE FIELD IF NOT EXISTS polling_interval_ms ON config TYPE int ASSERT $value > 0;
DEFINE FIELD IF NOT EXISTS updated_at ON config TYPE datetime DEFAULT time::now();
"#;
