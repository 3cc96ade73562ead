//! Tournament engine: draw, scheduling, results and rankings.
//!
//! Each public operation runs in one database transaction; an error drops
//! the transaction and nothing it wrote is kept.

use super::config::EngineConfig;
use super::draw::{self, DrawPlan};
use super::errors::{TournamentError, TournamentResult};
use super::locks::TournamentLocks;
use super::models::{
    DEFAULT_POOL_SIZE, DrawOptions, DrawSettings, DrawSummary, Match, MatchId, MatchPhase,
    MatchResult, MatchStatus, Outcome, RankingSummary, Registration, RegistrationId, ResultSummary,
    ScheduleSummary, Score, Side, SlotSource, TournamentFormat, TournamentId, TournamentInfo,
    TournamentStatus, WithdrawalSummary,
};
use super::{ranking, scheduler, standings, state_machine, store};
use crate::db::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use rand::{SeedableRng, rngs::StdRng};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// A match about to be concluded by the resolver
#[derive(Debug, Clone, Copy)]
struct Conclusion {
    match_id: MatchId,
    winner: RegistrationId,
    loser: RegistrationId,
    status: MatchStatus,
    score: Option<Score>,
    /// Settled because an entrant withdrew
    forfeit: bool,
}

impl Conclusion {
    /// Walkover for a resolved match with a withdrawn entrant
    fn forfeit(m: &Match, withdrawn: &HashSet<RegistrationId>) -> Option<Self> {
        let (home, away) = m.entrants()?;
        let (winner, loser) = match (withdrawn.contains(&home), withdrawn.contains(&away)) {
            (false, false) => return None,
            (true, false) => (away, home),
            // Both gone: home advances so the bracket can still finish.
            (_, true) => (home, away),
        };
        Some(Self {
            match_id: m.id,
            winner,
            loser,
            status: MatchStatus::Walkover,
            score: None,
            forfeit: true,
        })
    }
}

/// Tournament engine
#[derive(Clone)]
pub struct TournamentEngine {
    pool: Arc<SqlitePool>,
    config: EngineConfig,
    locks: TournamentLocks,
}

impl TournamentEngine {
    /// Create an engine with default tuning
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self::with_config(pool, EngineConfig::default())
    }

    pub fn with_config(pool: Arc<SqlitePool>, config: EngineConfig) -> Self {
        Self {
            pool,
            config,
            locks: TournamentLocks::new(),
        }
    }

    /// Per-tournament scheduling guards held by this engine and its clones
    pub fn locks(&self) -> &TournamentLocks {
        &self.locks
    }

    async fn begin(&self) -> TournamentResult<Transaction<'static, Sqlite>> {
        Ok(with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.pool.begin()).await?)
    }

    /// Generate the draw: freeze seeds and create the initial matches.
    ///
    /// # Errors
    ///
    /// * `DrawAlreadyPublished` - matches exist and `force_regenerate` is unset
    /// * `InvalidStatus` - registration is not closed
    /// * `InsufficientRegistrations` - fewer active entrants than the minimum
    pub async fn generate_draw(
        &self,
        tournament_id: TournamentId,
        options: DrawOptions,
    ) -> TournamentResult<DrawSummary> {
        let mut tx = self.begin().await?;
        let tournament = store::load_tournament(&mut tx, tournament_id).await?;

        let existing = store::count_matches(&mut tx, tournament_id).await?;
        if existing > 0 && !options.force_regenerate {
            return Err(TournamentError::DrawAlreadyPublished(tournament_id));
        }
        state_machine::ensure(tournament.status, "generate a draw", |s| {
            s.allows_draw(options.force_regenerate)
        })?;

        let entrants: Vec<Registration> = store::load_registrations(&mut tx, tournament_id)
            .await?
            .into_iter()
            .filter(|r| !r.withdrawn)
            .collect();
        let needed = tournament.min_registrations.max(2) as usize;
        if entrants.len() < needed {
            return Err(TournamentError::InsufficientRegistrations {
                needed,
                current: entrants.len(),
            });
        }

        let (ranked, plan, settings) = plan_draw(tournament.format, &entrants, &options)?;

        if existing > 0 {
            let removed = store::delete_matches(&mut tx, tournament_id).await?;
            log::warn!(
                "Tournament {} draw regenerated, {} match(es) discarded",
                tournament_id,
                removed
            );
        }
        store::freeze_draw(&mut tx, tournament_id, &ranked, &plan.pools).await?;
        store::save_draw_settings(&mut tx, tournament_id, &settings).await?;
        let ids = store::insert_plan(&mut tx, tournament_id, &plan).await?;

        if tournament.status != TournamentStatus::DrawPublished {
            let next = state_machine::transition(tournament.status, TournamentStatus::DrawPublished)?;
            store::set_status(&mut tx, tournament_id, tournament.status, next).await?;
        }
        tx.commit().await?;

        log::info!(
            "Tournament {} draw published: {} entrant(s), {} match(es)",
            tournament_id,
            ranked.len(),
            ids.len()
        );
        Ok(DrawSummary {
            matches_created: ids.len(),
            bracket_shape: plan.shape,
        })
    }

    /// Give every unscheduled, fully-resolved match a court and start time.
    ///
    /// Matches scheduled by an earlier pass are never moved.
    ///
    /// # Errors
    ///
    /// * `ScheduleInProgress` - another pass holds the tournament
    /// * `InvalidStatus` - no draw, or the tournament is finished
    /// * `NoCourtsConfigured` - nothing is written
    pub async fn schedule_matches(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<ScheduleSummary> {
        let _guard = self
            .locks
            .try_acquire(tournament_id)
            .ok_or(TournamentError::ScheduleInProgress(tournament_id))?;

        let mut tx = self.begin().await?;
        let tournament = store::load_tournament(&mut tx, tournament_id).await?;
        state_machine::ensure(
            tournament.status,
            "schedule matches",
            TournamentStatus::allows_scheduling,
        )?;

        let matches = store::load_matches(&mut tx, tournament_id).await?;
        let plan = scheduler::plan_schedule(
            tournament_id,
            tournament.courts,
            tournament.start_date,
            &matches,
        )?;

        let policy = self.config.retry_policy();
        for assignment in &plan.assignments {
            if !store::write_assignment(&mut tx, assignment, &policy).await? {
                log::warn!(
                    "Match {} was scheduled by another writer, abandoning pass for tournament {}",
                    assignment.match_id,
                    tournament_id
                );
                return Err(TournamentError::ScheduleInProgress(tournament_id));
            }
        }

        if !plan.assignments.is_empty() {
            store::bump_version(&mut tx, tournament_id, tournament.version).await?;
            if tournament.status == TournamentStatus::DrawPublished {
                let next = state_machine::transition(tournament.status, TournamentStatus::InProgress)?;
                store::set_status(&mut tx, tournament_id, tournament.status, next).await?;
            }
        }
        tx.commit().await?;

        let summary = plan.summary(tournament.courts.match_duration(), tournament.end_date);
        if summary.overruns_end_date {
            log::warn!(
                "Tournament {} schedule runs until {:?}, past its end date {:?}",
                tournament_id,
                summary.ends_at,
                tournament.end_date
            );
        }
        log::info!(
            "Tournament {} scheduled {} match(es) on {} court(s), {} waiting on results",
            tournament_id,
            summary.matches_scheduled,
            summary.courts_used,
            plan.waiting
        );
        Ok(summary)
    }

    /// Record a result and push the outcome into downstream slots.
    ///
    /// # Errors
    ///
    /// * `MatchAlreadyCompleted` - the match already has a result
    /// * `InvalidSlotState` - a slot is still waiting on another match
    /// * `InvalidScore` - the score does not give the declared winner the win
    pub async fn record_result(
        &self,
        match_id: MatchId,
        result: MatchResult,
    ) -> TournamentResult<ResultSummary> {
        result
            .validate()
            .map_err(|reason| TournamentError::InvalidScore { match_id, reason })?;

        let mut tx = self.begin().await?;
        let m = store::load_match(&mut tx, match_id).await?;
        if m.status.is_concluded() {
            return Err(TournamentError::MatchAlreadyCompleted(match_id));
        }

        let tournament = store::load_tournament(&mut tx, m.tournament_id).await?;
        state_machine::ensure(
            tournament.status,
            "record a result",
            TournamentStatus::allows_results,
        )?;

        let (home, away) = m
            .entrants()
            .ok_or(TournamentError::InvalidSlotState(match_id))?;
        let (winner, loser) = match result.winner() {
            Side::Home => (home, away),
            Side::Away => (away, home),
        };

        let mut summary = ResultSummary::default();
        let first = Conclusion {
            match_id,
            winner,
            loser,
            status: result.status(),
            score: result.score(),
            forfeit: false,
        };
        resolve(&mut tx, &tournament, VecDeque::from([first]), &mut summary).await?;
        tx.commit().await?;

        log::info!(
            "Match {} won by registration {} ({}); {} match(es) ready",
            match_id,
            winner,
            result.status().as_str(),
            summary.ready_matches.len()
        );
        Ok(summary)
    }

    /// Withdraw an entrant. Their open matches against a known opponent
    /// become walkovers now; later ones as soon as the opponent is known.
    pub async fn withdraw_registration(
        &self,
        registration_id: RegistrationId,
    ) -> TournamentResult<WithdrawalSummary> {
        let mut tx = self.begin().await?;
        let registration = store::load_registration(&mut tx, registration_id).await?;
        let tournament = store::load_tournament(&mut tx, registration.tournament_id).await?;
        state_machine::ensure(tournament.status, "withdraw a registration", |s| {
            !s.is_terminal()
        })?;

        if !store::set_withdrawn(&mut tx, registration_id).await? {
            log::debug!("Registration {} already withdrawn", registration_id);
            return Ok(WithdrawalSummary {
                walkovers: Vec::new(),
                advanced: false,
            });
        }

        let mut summary = ResultSummary::default();
        if tournament.status.allows_results() {
            let withdrawn = withdrawn_set(&mut tx, tournament.id).await?;
            let queue: VecDeque<Conclusion> = store::load_matches(&mut tx, tournament.id)
                .await?
                .iter()
                .filter(|m| !m.status.is_concluded() && m.involves(registration_id))
                .filter_map(|m| Conclusion::forfeit(m, &withdrawn))
                .collect();
            resolve(&mut tx, &tournament, queue, &mut summary).await?;
        }
        tx.commit().await?;

        log::info!(
            "Registration {} withdrawn from tournament {}, {} walkover(s)",
            registration_id,
            tournament.id,
            summary.walkovers.len()
        );
        Ok(WithdrawalSummary {
            walkovers: summary.walkovers,
            advanced: summary.advanced,
        })
    }

    /// Mark a scheduled match as being played
    pub async fn start_match(&self, match_id: MatchId) -> TournamentResult<()> {
        let mut tx = self.begin().await?;
        let m = store::load_match(&mut tx, match_id).await?;
        if m.status.is_concluded() {
            return Err(TournamentError::MatchAlreadyCompleted(match_id));
        }
        if m.status == MatchStatus::InProgress {
            return Ok(());
        }

        let tournament = store::load_tournament(&mut tx, m.tournament_id).await?;
        state_machine::ensure(
            tournament.status,
            "start a match",
            TournamentStatus::allows_results,
        )?;
        if !m.is_resolved() {
            return Err(TournamentError::InvalidSlotState(match_id));
        }
        if !store::mark_in_progress(&mut tx, match_id).await? {
            return Err(TournamentError::MatchNotScheduled(match_id));
        }
        tx.commit().await?;

        log::info!("Match {} started", match_id);
        Ok(())
    }

    /// Write final rankings and complete the tournament.
    ///
    /// # Errors
    ///
    /// * `StructureIncomplete` - some match has no result yet
    pub async fn finalize_rankings(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<RankingSummary> {
        let mut tx = self.begin().await?;
        let tournament = store::load_tournament(&mut tx, tournament_id).await?;
        state_machine::ensure(
            tournament.status,
            "finalize rankings",
            TournamentStatus::allows_results,
        )?;

        let registrations = store::load_registrations(&mut tx, tournament_id).await?;
        let matches = store::load_matches(&mut tx, tournament_id).await?;
        let rankings = ranking::final_rankings(
            tournament.format,
            tournament.draw_settings.as_ref(),
            &registrations,
            &matches,
        )?;

        store::write_rankings(&mut tx, tournament_id, &rankings).await?;
        let next = state_machine::transition(tournament.status, TournamentStatus::Completed)?;
        store::set_status(&mut tx, tournament_id, tournament.status, next).await?;
        tx.commit().await?;

        log::info!(
            "Tournament {} completed, {} ranking(s) written",
            tournament_id,
            rankings.len()
        );
        Ok(RankingSummary {
            rankings_written: rankings.len(),
        })
    }

    pub async fn open_registration(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        self.change_status(tournament_id, TournamentStatus::RegistrationOpen)
            .await
    }

    pub async fn close_registration(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        self.change_status(tournament_id, TournamentStatus::RegistrationClosed)
            .await
    }

    pub async fn cancel_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        self.change_status(tournament_id, TournamentStatus::Canceled)
            .await
    }

    async fn change_status(
        &self,
        tournament_id: TournamentId,
        to: TournamentStatus,
    ) -> TournamentResult<()> {
        let mut tx = self.begin().await?;
        let tournament = store::load_tournament(&mut tx, tournament_id).await?;
        let next = state_machine::transition(tournament.status, to)?;
        store::set_status(&mut tx, tournament_id, tournament.status, next).await?;
        tx.commit().await?;

        log::info!(
            "Tournament {} moved from {} to {}",
            tournament_id,
            tournament.status,
            next
        );
        Ok(())
    }
}

/// Order entrants and plan the initial matches for `format`
fn plan_draw(
    format: TournamentFormat,
    entrants: &[Registration],
    options: &DrawOptions,
) -> TournamentResult<(Vec<RegistrationId>, DrawPlan, DrawSettings)> {
    let mut rng = match options.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let ranked = draw::seeded_order(entrants, &mut rng);
    let mut settings = options.settings();

    let plan = match format {
        TournamentFormat::Elimination => {
            settings.pool_size = None;
            draw::elimination_plan(&ranked, 1, settings.third_place_match)
        }
        TournamentFormat::RoundRobin => {
            let size = options.pool_size.unwrap_or(ranked.len() as u32);
            validate_pool_size(size)?;
            settings.pool_size = Some(size);
            draw::pool_plan(&ranked, size as usize, None)
        }
        TournamentFormat::PoolsThenElimination => {
            let size = options.pool_size.unwrap_or(DEFAULT_POOL_SIZE);
            validate_pool_size(size)?;
            if settings.advance_per_pool == 0 || settings.advance_per_pool > size {
                return Err(TournamentError::InvalidConfig(format!(
                    "{} qualifier(s) per pool does not fit pools of {}",
                    settings.advance_per_pool, size
                )));
            }
            settings.pool_size = Some(size);
            draw::pool_plan(&ranked, size as usize, Some(settings.advance_per_pool))
        }
    };
    Ok((ranked, plan, settings))
}

fn validate_pool_size(size: u32) -> TournamentResult<()> {
    if size < 2 {
        return Err(TournamentError::InvalidConfig(format!(
            "pool size must be at least 2, got {size}"
        )));
    }
    Ok(())
}

async fn withdrawn_set(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
) -> TournamentResult<HashSet<RegistrationId>> {
    Ok(store::load_registrations(conn, tournament_id)
        .await?
        .into_iter()
        .filter(|r| r.withdrawn)
        .map(|r| r.id)
        .collect())
}

/// Conclude the queued matches and everything they settle in turn:
/// downstream slots are filled, matches left with a withdrawn entrant are
/// walked over, and a finished pool phase gets its knockout bracket.
async fn resolve(
    conn: &mut SqliteConnection,
    tournament: &TournamentInfo,
    mut queue: VecDeque<Conclusion>,
    summary: &mut ResultSummary,
) -> TournamentResult<()> {
    let withdrawn = withdrawn_set(conn, tournament.id).await?;

    loop {
        while let Some(conclusion) = queue.pop_front() {
            let concluded = store::complete_match(
                conn,
                conclusion.match_id,
                conclusion.winner,
                conclusion.status,
                conclusion.score,
            )
            .await?;
            if !concluded {
                return Err(TournamentError::MatchAlreadyCompleted(conclusion.match_id));
            }
            if conclusion.forfeit {
                log::info!(
                    "Match {} walked over to registration {}",
                    conclusion.match_id,
                    conclusion.winner
                );
                summary.walkovers.push(conclusion.match_id);
            }

            for (outcome, registration) in [
                (Outcome::Winner, conclusion.winner),
                (Outcome::Loser, conclusion.loser),
            ] {
                let source = SlotSource {
                    match_id: conclusion.match_id,
                    outcome,
                };
                for next_id in store::fill_slots(conn, source, registration).await? {
                    if outcome == Outcome::Winner {
                        summary.advanced = true;
                    }
                    let next = store::load_match(conn, next_id).await?;
                    enqueue_if_ready(&next, &withdrawn, &mut queue, summary);
                }
            }
        }

        if tournament.format != TournamentFormat::PoolsThenElimination {
            break;
        }
        let Some(created) = create_knockout(conn, tournament).await? else {
            break;
        };
        summary.knockout_matches_created += created.len();
        for m in &created {
            enqueue_if_ready(m, &withdrawn, &mut queue, summary);
        }
    }
    Ok(())
}

fn enqueue_if_ready(
    m: &Match,
    withdrawn: &HashSet<RegistrationId>,
    queue: &mut VecDeque<Conclusion>,
    summary: &mut ResultSummary,
) {
    if m.status.is_concluded() || !m.is_resolved() {
        return;
    }
    match Conclusion::forfeit(m, withdrawn) {
        Some(walkover) => queue.push_back(walkover),
        None if !summary.ready_matches.contains(&m.id) => summary.ready_matches.push(m.id),
        None => {}
    }
}

/// Build the knockout bracket once every pool match has concluded.
/// Returns the created matches, or `None` if it is not time yet.
async fn create_knockout(
    conn: &mut SqliteConnection,
    tournament: &TournamentInfo,
) -> TournamentResult<Option<Vec<Match>>> {
    let matches = store::load_matches(conn, tournament.id).await?;
    if matches.iter().any(|m| m.phase == MatchPhase::Elimination) {
        return Ok(None);
    }
    let pool_matches: Vec<&Match> = matches
        .iter()
        .filter(|m| m.phase == MatchPhase::Pool)
        .collect();
    if pool_matches.is_empty() || pool_matches.iter().any(|m| !m.status.is_concluded()) {
        return Ok(None);
    }

    let settings = tournament.draw_settings.ok_or_else(|| {
        TournamentError::Inconsistency(format!(
            "tournament {} finished its pools without draw settings",
            tournament.id
        ))
    })?;
    let registrations = store::load_registrations(conn, tournament.id).await?;
    let table = standings::all_pool_standings(&registrations, &matches);
    let qualified = standings::qualifiers(&table, settings.advance_per_pool);
    if qualified.len() < 2 {
        log::info!(
            "Tournament {} pools finished with {} qualifier(s), no knockout",
            tournament.id,
            qualified.len()
        );
        return Ok(None);
    }

    let first_round = pool_matches
        .iter()
        .map(|m| m.round_number)
        .max()
        .unwrap_or(0)
        + 1;
    let plan = draw::elimination_plan(&qualified, first_round, settings.third_place_match);
    let ids = store::insert_plan(conn, tournament.id, &plan).await?;
    log::info!(
        "Tournament {} pools finished, knockout of {} with {} match(es) created",
        tournament.id,
        qualified.len(),
        ids.len()
    );

    let mut created = Vec::with_capacity(ids.len());
    for id in ids {
        created.push(store::load_match(conn, id).await?);
    }
    Ok(Some(created))
}
