//! Database module providing SQLite connection pooling and utilities.
//!
//! This module manages the database connection pool using sqlx, applies the
//! schema, and provides utilities for database operations across the crate.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub mod config;
pub mod repository;
pub mod schema;
pub mod timeouts;

pub use config::DatabaseConfig;
pub use repository::{SqliteTournamentRepository, TournamentRepository};

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool and apply the schema
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Database instance or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use club_tournaments::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.connection_timeout_secs));

        let pool_options =
            SqlitePoolOptions::new().acquire_timeout(Duration::from_secs(config.connection_timeout_secs));

        // Every connection to `:memory:` opens its own empty database, so
        // the pool must hold exactly one and never recycle it.
        let pool_options = if config.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
                .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::raw_sql(schema::SCHEMA).execute(&pool).await?;
        log::debug!("Database ready at {}", config.database_url);

        Ok(Self { pool })
    }

    /// Fresh private in-memory database
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::new(&DatabaseConfig::in_memory()).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
