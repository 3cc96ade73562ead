//! Tournament engine error types.

use super::models::{MatchId, RegistrationId, TournamentId, TournamentStatus};
use crate::db::timeouts::TimeoutError;
use thiserror::Error;

/// Tournament engine errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Registration not found: {0}")]
    RegistrationNotFound(RegistrationId),

    #[error("Insufficient registrations: need {needed}, have {current}")]
    InsufficientRegistrations { needed: usize, current: usize },

    #[error("Draw already published for tournament {0}")]
    DrawAlreadyPublished(TournamentId),

    #[error("No courts configured for tournament {0}")]
    NoCourtsConfigured(TournamentId),

    #[error("Scheduling already in progress for tournament {0}")]
    ScheduleInProgress(TournamentId),

    #[error("Cannot {operation} while tournament is {actual}")]
    InvalidStatus {
        operation: &'static str,
        actual: TournamentStatus,
    },

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: TournamentStatus,
        to: TournamentStatus,
    },

    #[error("Match already completed: {0}")]
    MatchAlreadyCompleted(MatchId),

    #[error("Match {0} does not have two concrete entrants")]
    InvalidSlotState(MatchId),

    #[error("Invalid score for match {match_id}: {reason}")]
    InvalidScore { match_id: MatchId, reason: String },

    #[error("Match {0} has not been scheduled")]
    MatchNotScheduled(MatchId),

    #[error("Tournament structure incomplete: {remaining} match(es) still open")]
    StructureIncomplete { remaining: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persisted state contradicts itself; never resolved by overwriting
    #[error("Internal inconsistency: {0}")]
    Inconsistency(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TournamentError {
    /// Validation failures that will fail again unless the input changes
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TournamentError::InsufficientRegistrations { .. }
                | TournamentError::DrawAlreadyPublished(_)
                | TournamentError::NoCourtsConfigured(_)
                | TournamentError::InvalidStatus { .. }
                | TournamentError::InvalidTransition { .. }
                | TournamentError::MatchAlreadyCompleted(_)
                | TournamentError::InvalidSlotState(_)
                | TournamentError::InvalidScore { .. }
                | TournamentError::MatchNotScheduled(_)
                | TournamentError::StructureIncomplete { .. }
                | TournamentError::InvalidConfig(_)
        )
    }

    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_)
            | TournamentError::Timeout(_)
            | TournamentError::Serialization(_) => "Internal server error".to_string(),
            TournamentError::Inconsistency(_) => {
                "Tournament data is inconsistent; contact an administrator".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
