//! # Club Tournaments
//!
//! Tournament engine for a club-management service: it turns a list of
//! registrations into a competition draw and fits every match onto the
//! club's courts.
//!
//! ## Architecture
//!
//! A tournament moves through a fixed lifecycle:
//!
//! - **Draft**: being configured
//! - **RegistrationOpen / RegistrationClosed**: entrants sign up, then the list is frozen
//! - **DrawPublished**: seeds are frozen and the matches exist
//! - **InProgress**: at least one match has a court and start time
//! - **Completed**: every match has a result and final rankings are written
//! - **Canceled**: abandoned from any earlier state
//!
//! Draws are either a seeded single-elimination bracket or round-robin
//! pools, optionally followed by a knockout of the pool qualifiers. Later
//! bracket slots refer to the winner (or loser) of an earlier match and
//! are filled in as results arrive.
//!
//! ## Core Modules
//!
//! - [`tournament`]: draw generation, scheduling, result resolution, rankings
//! - [`db`]: SQLite pool, schema, timeouts and the repository seam
//!
//! ## Example
//!
//! ```
//! use club_tournaments::tournament::draw::elimination_plan;
//!
//! // Eight entrants, best seed first: seven matches over three rounds.
//! let plan = elimination_plan(&[1, 2, 3, 4, 5, 6, 7, 8], 1, false);
//! assert_eq!(plan.matches.len(), 7);
//! ```

/// Connection pool, schema and repository.
pub mod db;
pub use db::{Database, DatabaseConfig};

/// Draws, scheduling, results and rankings.
pub mod tournament;
pub use tournament::{TournamentEngine, TournamentError, TournamentResult};
