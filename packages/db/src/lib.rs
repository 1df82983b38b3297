//! SurrealDB-backed job store and config store.
//!
//! [`repositories::JobRepository`] owns every job record and the claim
//! protocol; [`repositories::ConfigRepository`] holds the polling interval.
//!
//! # Features
//!
//! - `memory` (default): `mem://` endpoints
//! - `rocksdb`: `rocksdb://path` endpoints
//! - `remote`: `ws://host:port` endpoints

mod connection;
mod error;
pub mod repositories;
mod schema;

pub use connection::{Credentials, Database, DbConfig, get_db, init_db};
pub use error::DbError;
pub use schema::init_schema;

/// Connect and make sure the tables exist. Call once at start-up.
pub async fn init(config: DbConfig) -> Result<(), DbError> {
    init_db(config).await?;
    init_schema().await
}
