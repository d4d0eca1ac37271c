//! PostgreSQL persistence
//!
//! Connection pool management and the PostgreSQL implementation of the
//! claims store port. Queries use the runtime API so the crate builds
//! without a live database; schema lives in `migrations/`.

pub mod claims_store;
pub mod error;
pub mod pool;

pub use claims_store::PostgresClaimStore;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};

/// Embedded migrations, applied at startup with `MIGRATOR.run(&pool)`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
