//! Database query timeout and retry helpers
//!
//! Provides timeout wrappers for database operations to prevent indefinite hangs,
//! and the retry policy for statements that hit a busy or locked database.

use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for opening a transaction (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default retries for a transient write failure
pub const DEFAULT_WRITE_RETRIES: u32 = 3;

/// Default backoff before the first retry; later retries wait longer
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// SQLite primary result codes for a busy or locked database
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Error type for timeout operations
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for timeout operations
pub type TimeoutResult<T> = Result<T, TimeoutError>;

/// Execute a query with timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `TimeoutResult<T>` - Result or timeout error
///
/// # Example
///
/// ```no_run
/// use club_tournaments::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::SqlitePool;
/// # async fn example(pool: &SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
///
/// let result = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT * FROM tournaments WHERE id = ?")
///         .bind(1)
///         .fetch_one(pool)
/// ).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match timeout(duration, future).await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(TimeoutError::Database(e)),
        Err(_) => Err(TimeoutError::Timeout(duration)),
    }
}

/// Execute a query with default timeout (5 seconds)
pub async fn with_default_timeout<F, T>(future: F) -> TimeoutResult<T>
where
    F: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Whether an error may go away if the statement is simply tried again
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            // Extended codes carry the primary code in the low byte.
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}

/// Per-statement retry for transient write failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// Whether `attempt` (1-based, already failed with `err`) may be retried
    pub fn should_retry(&self, attempt: u32, err: &sqlx::Error) -> bool {
        attempt <= self.retries && is_transient(err)
    }

    /// Linear backoff before retry number `attempt`
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt.max(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_RETRIES, DEFAULT_RETRY_BACKOFF)
    }
}
