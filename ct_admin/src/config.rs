//! Admin tool configuration management.
//!
//! Consolidates the environment reads of the library configs and validates
//! them before a database connection is attempted.

use club_tournaments::DatabaseConfig;
use club_tournaments::tournament::EngineConfig;

/// Longest backoff accepted for schedule write retries
const MAX_RETRY_BACKOFF_MS: u64 = 5_000;

/// Complete configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Engine tuning
    pub engine: EngineConfig,
}

impl AdminConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL (from CLI args)
    pub fn from_env(database_url_override: Option<String>) -> Self {
        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        AdminConfig {
            database,
            engine: EngineConfig::from_env(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;

        if !db.database_url.starts_with("sqlite:") {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: format!("Expected a sqlite: URL, got '{}'", db.database_url),
            });
        }

        if db.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!("Cannot exceed max connections ({})", db.max_connections),
            });
        }

        if db.connection_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_CONNECTION_TIMEOUT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.engine.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(ConfigError::Invalid {
                var: "SCHEDULE_RETRY_BACKOFF_MS".to_string(),
                reason: format!("Must be at most {MAX_RETRY_BACKOFF_MS}"),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
