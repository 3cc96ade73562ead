//! Tournament engine for club competitions.
//!
//! This module provides:
//! - Draw generation for seeded elimination brackets and round-robin pools
//! - Court and time scheduling under capacity and ordering constraints
//! - Result recording with automatic advancement and walkovers
//! - Final rankings and the tournament lifecycle
//!
//! ## Example
//!
//! ```no_run
//! use club_tournaments::db::{Database, SqliteTournamentRepository, TournamentRepository};
//! use club_tournaments::tournament::{
//!     DrawOptions, NewRegistration, TournamentConfig, TournamentEngine, TournamentFormat,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let repo = SqliteTournamentRepository::new(db.pool().clone());
//!     let engine = TournamentEngine::new(Arc::new(db.pool().clone()));
//!
//!     let start = chrono::NaiveDate::from_ymd_opt(2026, 6, 6).unwrap();
//!     let config = TournamentConfig::new("Summer Open", TournamentFormat::Elimination, start);
//!     let tournament_id = repo.create_tournament(&config).await?;
//!
//!     engine.open_registration(tournament_id).await?;
//!     for name in ["Ana", "Ben", "Cleo", "Dev"] {
//!         repo.register_entry(tournament_id, &NewRegistration::single(name)).await?;
//!     }
//!     engine.close_registration(tournament_id).await?;
//!
//!     let draw = engine.generate_draw(tournament_id, DrawOptions::default()).await?;
//!     let schedule = engine.schedule_matches(tournament_id).await?;
//!     println!("{} matches, {} scheduled", draw.matches_created, schedule.matches_scheduled);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod draw;
pub mod errors;
pub mod locks;
pub mod manager;
pub mod models;
pub mod ranking;
pub mod scheduler;
pub mod standings;
pub mod state_machine;
pub mod store;

pub use config::EngineConfig;
pub use errors::{TournamentError, TournamentResult};
pub use locks::{TournamentGuard, TournamentLocks};
pub use manager::TournamentEngine;
pub use models::{
    BracketShape, CourtConfig, DrawOptions, DrawSettings, DrawSummary, Match, MatchId,
    MatchPhase, MatchResult, MatchStatus, NewRegistration, Outcome, RankingSummary, Registration,
    RegistrationId, ResultSummary, RoundType, ScheduleSummary, Score, Side, Slot, SlotSource,
    TournamentConfig, TournamentFormat, TournamentId, TournamentInfo, TournamentStatus,
    WithdrawalSummary,
};
pub use scheduler::{CourtAssignment, SchedulePlan, plan_schedule};
pub use standings::StandingRow;
