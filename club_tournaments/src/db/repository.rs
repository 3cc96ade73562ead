//! Repository trait for the tournament tables.
//!
//! This is the narrow CRUD seam used by the surrounding product: creating
//! tournaments, taking registrations and reading matches. Draws, schedules
//! and results go through [`crate::tournament::TournamentEngine`].

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::tournament::models::{
    Match, MatchId, NewRegistration, Registration, RegistrationId, TournamentConfig, TournamentId,
    TournamentInfo, TournamentStatus,
};
use crate::tournament::{TournamentError, TournamentResult, state_machine, store};

/// Trait for tournament repository operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create a tournament in `draft`
    async fn create_tournament(&self, config: &TournamentConfig) -> TournamentResult<TournamentId>;

    /// Register an entrant; only while registration is open
    async fn register_entry(
        &self,
        tournament_id: TournamentId,
        entry: &NewRegistration,
    ) -> TournamentResult<RegistrationId>;

    async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<TournamentInfo>;

    async fn list_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>>;

    /// Matches ordered by round and match order
    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>>;

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match>;
}

/// Default SQLite implementation of `TournamentRepository`
#[derive(Clone)]
pub struct SqliteTournamentRepository {
    pool: SqlitePool,
}

impl SqliteTournamentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn validate_config(config: &TournamentConfig) -> TournamentResult<()> {
    if config.name.trim().is_empty() {
        return Err(TournamentError::InvalidConfig(
            "tournament name must not be empty".to_string(),
        ));
    }
    if config.min_registrations < 2 {
        return Err(TournamentError::InvalidConfig(format!(
            "at least 2 registrations are needed, got {}",
            config.min_registrations
        )));
    }
    if config.courts.match_duration_minutes == 0 {
        return Err(TournamentError::InvalidConfig(
            "match duration must be positive".to_string(),
        ));
    }
    if let Some(end) = config.end_date
        && end < config.start_date
    {
        return Err(TournamentError::InvalidConfig(format!(
            "end date {end} is before start date {}",
            config.start_date
        )));
    }
    Ok(())
}

#[async_trait]
impl TournamentRepository for SqliteTournamentRepository {
    async fn create_tournament(&self, config: &TournamentConfig) -> TournamentResult<TournamentId> {
        validate_config(config)?;
        let mut conn = self.pool.acquire().await?;
        let id = store::insert_tournament(&mut conn, config).await?;
        log::info!("Created tournament {} '{}' ({})", id, config.name, config.format);
        Ok(id)
    }

    async fn register_entry(
        &self,
        tournament_id: TournamentId,
        entry: &NewRegistration,
    ) -> TournamentResult<RegistrationId> {
        if entry.player_one.trim().is_empty() {
            return Err(TournamentError::InvalidConfig(
                "player name must not be empty".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let tournament = store::load_tournament(&mut tx, tournament_id).await?;
        state_machine::ensure(
            tournament.status,
            "register",
            TournamentStatus::accepts_registrations,
        )?;
        let id = store::insert_registration(&mut tx, tournament_id, entry).await?;
        tx.commit().await?;

        log::debug!("Registration {} added to tournament {}", id, tournament_id);
        Ok(id)
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<TournamentInfo> {
        let mut conn = self.pool.acquire().await?;
        store::load_tournament(&mut conn, tournament_id).await
    }

    async fn list_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>> {
        let mut conn = self.pool.acquire().await?;
        store::load_tournament(&mut conn, tournament_id).await?;
        store::load_registrations(&mut conn, tournament_id).await
    }

    async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let mut conn = self.pool.acquire().await?;
        store::load_tournament(&mut conn, tournament_id).await?;
        store::load_matches(&mut conn, tournament_id).await
    }

    async fn get_match(&self, match_id: MatchId) -> TournamentResult<Match> {
        let mut conn = self.pool.acquire().await?;
        store::load_match(&mut conn, match_id).await
    }
}
