//! Database configuration module.
//!
//! Provides configuration structures for database connection management.

use std::env;
use std::str::FromStr;

/// In-memory database URL, used by tests and dry runs
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds, also used as the SQLite busy timeout
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: SQLite connection string (default: `sqlite://club_tournaments.db`)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 5)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 1)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    ///
    /// Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        }
    }

    /// File database next to the working directory, created on first use
    pub fn development() -> Self {
        Self {
            database_url: "sqlite://club_tournaments.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }

    /// Private in-memory database on a single connection
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Self::development()
        }
    }

    /// An in-memory database lives and dies with its connection
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("{name}={raw:?} is not valid, using {default}");
            default
        }),
        Err(_) => default,
    }
}
