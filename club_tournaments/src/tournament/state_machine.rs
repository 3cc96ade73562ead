//! Tournament lifecycle transitions and operation gating.
//!
//! ```text
//! draft -> registration_open -> registration_closed -> draw_published -> in_progress -> completed
//!    \______________\___________________\___________________\____________\--> canceled
//! ```

use super::errors::{TournamentError, TournamentResult};
use super::models::TournamentStatus;

impl TournamentStatus {
    /// Completed and canceled tournaments accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Canceled)
    }

    pub fn can_transition_to(&self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;

        match (self, next) {
            (from, Canceled) => !from.is_terminal(),
            (Draft, RegistrationOpen)
            | (RegistrationOpen, RegistrationClosed)
            | (RegistrationClosed, DrawPublished)
            | (DrawPublished, InProgress)
            | (InProgress, Completed) => true,
            // A draw may finish without ever being scheduled (e.g. all walkovers).
            (DrawPublished, Completed) => true,
            _ => false,
        }
    }

    pub fn accepts_registrations(&self) -> bool {
        *self == TournamentStatus::RegistrationOpen
    }

    /// Draw generation; `force` allows redrawing an unscheduled draw
    pub fn allows_draw(&self, force: bool) -> bool {
        match self {
            TournamentStatus::RegistrationClosed => true,
            TournamentStatus::DrawPublished => force,
            _ => false,
        }
    }

    pub fn allows_scheduling(&self) -> bool {
        matches!(
            self,
            TournamentStatus::DrawPublished | TournamentStatus::InProgress
        )
    }

    /// Results, walkovers and withdrawals
    pub fn allows_results(&self) -> bool {
        self.allows_scheduling()
    }
}

/// Validate a transition, returning the new status
pub fn transition(
    from: TournamentStatus,
    to: TournamentStatus,
) -> TournamentResult<TournamentStatus> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(TournamentError::InvalidTransition { from, to })
    }
}

/// Reject `operation` unless `allowed` holds for the current status
pub fn ensure(
    status: TournamentStatus,
    operation: &'static str,
    allowed: impl FnOnce(&TournamentStatus) -> bool,
) -> TournamentResult<()> {
    if allowed(&status) {
        Ok(())
    } else {
        Err(TournamentError::InvalidStatus {
            operation,
            actual: status,
        })
    }
}
