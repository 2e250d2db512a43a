//! # Database Module
//!
//! This module handles all database operations for the marketplace backend.
//! We use PostgreSQL for storing:
//!
//! - Users, host profiles and listings
//! - Bookings with their frozen price snapshots
//! - Payments, reviews and disputes (at most one of each per booking)
//! - Refund issues (reconciliation log for refunds that failed)
//!
//! ## Consistency
//!
//! The rules that must survive concurrent requests live in the schema:
//! unique keys for "one per booking" records and an `EXCLUDE USING gist`
//! constraint so no two PENDING/CONFIRMED bookings of one listing share a
//! night. Violations surface as [`DatabaseError::Conflict`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      DATABASE LAYER                              │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐   │
//! │  │          MarketplaceStore (trait used by services)        │   │
//! │  └──────────────────────────────────────────────────────────┘   │
//! │                 │                              │                 │
//! │                 ▼                              ▼                 │
//! │  ┌────────────────────────────┐   ┌──────────────────────────┐  │
//! │  │ Database (queries.rs)      │   │ MemoryStore (unit tests) │  │
//! │  │ deadpool-postgres pool     │   │                          │  │
//! │  └────────────────────────────┘   └──────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod models;
pub mod queries;
pub mod store;
#[cfg(test)]
pub mod memory;

use deadpool_postgres::{Config, Pool, PoolError, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Config as TokioConfig};
use thiserror::Error;
use tracing::{debug, info, warn, error};

pub use store::MarketplaceStore;

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to connect to the database
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryError(tokio_postgres::Error),

    /// Migration failed
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A uniqueness or exclusion constraint rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored value could not be mapped back into a model
    #[error("Corrupt row: {0}")]
    Decode(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl From<tokio_postgres::Error> for DatabaseError {
    fn from(e: tokio_postgres::Error) -> Self {
        match e.code().cloned() {
            Some(code) if code == SqlState::UNIQUE_VIOLATION => {
                let constraint = e
                    .as_db_error()
                    .and_then(|db| db.constraint())
                    .unwrap_or("unique key")
                    .to_string();
                DatabaseError::Conflict(format!("duplicate value violates {}", constraint))
            }
            Some(code) if code == SqlState::EXCLUSION_VIOLATION => {
                DatabaseError::Conflict("dates overlap an existing booking".to_string())
            }
            _ => DatabaseError::QueryError(e),
        }
    }
}

impl From<PoolError> for DatabaseError {
    fn from(e: PoolError) -> Self {
        DatabaseError::ConnectionError(e.to_string())
    }
}

impl From<models::ParseEnumError> for DatabaseError {
    fn from(e: models::ParseEnumError) -> Self {
        DatabaseError::Decode(e.to_string())
    }
}

/// Schema applied at startup. Every statement is idempotent.
const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Database connection wrapper.
///
/// This struct wraps the connection pool. Services never use it directly;
/// they go through the [`MarketplaceStore`] trait it implements.
///
/// ## Usage
///
/// ```rust,ignore
/// let db = Database::connect("postgres://...", 10).await?;
/// db.run_migrations().await?;
/// let listing = queries::get_listing(db.pool(), listing_id).await?;
/// ```
#[derive(Clone)]
pub struct Database {
    /// The connection pool
    pool: Pool,
}

impl Database {
    /// Connect to the PostgreSQL database.
    ///
    /// ## Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    /// * `max_size` - Maximum number of pooled connections
    ///
    /// ## Returns
    ///
    /// * `Ok(Database)` - Connected successfully
    /// * `Err(DatabaseError)` - Connection failed
    pub async fn connect(database_url: &str, max_size: usize) -> Result<Self, DatabaseError> {
        info!("Connecting to database...");

        let tokio_config = database_url.parse::<TokioConfig>()
            .map_err(|e| DatabaseError::ConfigError(format!("Invalid database URL: {}", e)))?;

        let mut config = Config::new();
        config.dbname = tokio_config.get_dbname().map(str::to_string);
        config.user = tokio_config.get_user().map(str::to_string);
        config.password = tokio_config
            .get_password()
            .map(|p| String::from_utf8_lossy(p).to_string());
        if let Some(tokio_postgres::config::Host::Tcp(host)) = tokio_config.get_hosts().first() {
            config.host = Some(host.clone());
        }
        config.port = tokio_config.get_ports().first().copied();
        config.pool = Some(deadpool_postgres::PoolConfig {
            max_size,
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        let database = Self { pool };
        database.ping().await?;

        info!("Database connection established (pool size {})", max_size);
        Ok(database)
    }

    /// Apply `migrations/001_initial_schema.sql`.
    ///
    /// The file only contains `IF NOT EXISTS` DDL, so running it on every
    /// boot is safe.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations...");

        let client = self.pool.get().await?;

        // batch_execute does not need comments; strip them so error
        // previews show only SQL.
        let cleaned_sql: String = INITIAL_SCHEMA
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");

        debug!("Executing migration SQL ({} bytes)", cleaned_sql.len());

        match client.batch_execute(&cleaned_sql).await {
            Ok(()) => {
                info!("Migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                let detail = e
                    .as_db_error()
                    .and_then(|db| db.detail())
                    .unwrap_or("No detail available")
                    .to_string();

                // 42P07 duplicate_table / 42710 duplicate_object: schema already there
                let already_applied = matches!(
                    e.code(),
                    Some(code) if *code == SqlState::DUPLICATE_TABLE || *code == SqlState::DUPLICATE_OBJECT
                );
                if already_applied {
                    warn!("Some database objects already exist: {}", e);
                    return Ok(());
                }

                error!("Migration execution error: {} ({})", e, detail);
                Err(DatabaseError::MigrationError(format!("{} ({})", e, detail)))
            }
        }
    }

    /// Cheap round trip used by connect and the health check.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        let client = self.pool.get().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

// Re-export commonly used items
pub use models::*;
