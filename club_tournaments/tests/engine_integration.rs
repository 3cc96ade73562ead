//! Integration tests for the tournament engine on an in-memory database.
//!
//! Tests draw generation, court scheduling, result resolution, withdrawals
//! and final rankings through the public engine and repository API.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use club_tournaments::db::{Database, SqliteTournamentRepository, TournamentRepository};
use club_tournaments::tournament::{
    BracketShape, CourtConfig, DrawOptions, Match, MatchResult, MatchStatus, NewRegistration,
    RegistrationId, RoundType, Score, Side, Slot, TournamentConfig, TournamentEngine,
    TournamentError, TournamentFormat, TournamentId, TournamentStatus,
};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;

struct Harness {
    engine: TournamentEngine,
    repo: SqliteTournamentRepository,
    pool: SqlitePool,
}

/// Helper to create an engine over a fresh in-memory database
async fn setup() -> Harness {
    let db = Database::in_memory()
        .await
        .expect("Failed to create test database");
    let pool = db.pool().clone();
    Harness {
        engine: TournamentEngine::new(Arc::new(pool.clone())),
        repo: SqliteTournamentRepository::new(pool.clone()),
        pool,
    }
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    start_date().and_hms_opt(hour, minute, 0).unwrap()
}

fn courts(available: u32) -> CourtConfig {
    CourtConfig::new(
        available,
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        90,
    )
}

/// Better seed (lower registration id) wins 6-3
fn favourite_wins(m: &Match) -> MatchResult {
    let (home, away) = m.entrants().expect("match should be resolved");
    let (winner, score) = if home < away {
        (Side::Home, Score::new(6, 3))
    } else {
        (Side::Away, Score::new(3, 6))
    };
    MatchResult::Played {
        winner,
        score: Some(score),
    }
}

impl Harness {
    /// Create a tournament, register `entrants` seeded in order, close registration
    async fn tournament(
        &self,
        format: TournamentFormat,
        entrants: u32,
        courts: CourtConfig,
    ) -> (TournamentId, Vec<RegistrationId>) {
        let config = TournamentConfig::new("Spring Cup", format, start_date()).with_courts(courts);
        let id = self.repo.create_tournament(&config).await.unwrap();
        self.engine.open_registration(id).await.unwrap();

        let mut registrations = Vec::new();
        for seed in 1..=entrants {
            let entry = NewRegistration::single(format!("Player {seed}")).seeded(seed);
            registrations.push(self.repo.register_entry(id, &entry).await.unwrap());
        }
        self.engine.close_registration(id).await.unwrap();
        (id, registrations)
    }

    async fn matches(&self, id: TournamentId) -> Vec<Match> {
        self.repo.list_matches(id).await.unwrap()
    }

    async fn status(&self, id: TournamentId) -> TournamentStatus {
        self.repo.get_tournament(id).await.unwrap().status
    }

    /// Record a result for every resolved open match; returns how many
    async fn play_ready(&self, id: TournamentId) -> usize {
        let ready: Vec<Match> = self
            .matches(id)
            .await
            .into_iter()
            .filter(|m| m.is_resolved() && !m.status.is_concluded())
            .collect();
        for m in &ready {
            self.engine
                .record_result(m.id, favourite_wins(m))
                .await
                .unwrap();
        }
        ready.len()
    }

    /// Alternate scheduling passes and results until nothing is left
    async fn play_out(&self, id: TournamentId) {
        loop {
            self.engine.schedule_matches(id).await.unwrap();
            if self.play_ready(id).await == 0 {
                break;
            }
        }
    }

    async fn rankings(&self, id: TournamentId) -> HashMap<RegistrationId, u32> {
        self.repo
            .list_registrations(id)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|r| Some((r.id, r.final_ranking?)))
            .collect()
    }
}

fn round(matches: &[Match], round_number: u32) -> Vec<&Match> {
    matches
        .iter()
        .filter(|m| m.round_number == round_number)
        .collect()
}

#[tokio::test]
async fn test_eight_entrants_two_courts_full_lifecycle() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::Elimination, 8, courts(2)).await;

    let draw = h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    assert_eq!(draw.matches_created, 7);
    assert_eq!(
        draw.bracket_shape,
        BracketShape::Elimination {
            bracket_size: 8,
            rounds: 3,
            byes: 0
        }
    );
    assert_eq!(h.status(id).await, TournamentStatus::DrawPublished);

    let first = h.engine.schedule_matches(id).await.unwrap();
    assert_eq!(first.matches_scheduled, 4);
    assert_eq!(first.courts_used, 2);
    assert_eq!(first.start_date, Some(at(8, 0)));
    assert_eq!(h.status(id).await, TournamentStatus::InProgress);

    let matches = h.matches(id).await;
    let mut round_one: Vec<_> = round(&matches, 1)
        .iter()
        .map(|m| m.scheduled_time.unwrap())
        .collect();
    round_one.sort();
    assert_eq!(round_one, vec![at(8, 0), at(8, 0), at(9, 30), at(9, 30)]);
    assert!(round(&matches, 2).iter().all(|m| m.scheduled_time.is_none()));

    for m in round(&matches, 1) {
        let summary = h.engine.record_result(m.id, favourite_wins(m)).await.unwrap();
        assert!(summary.advanced);
    }

    let second = h.engine.schedule_matches(id).await.unwrap();
    assert_eq!(second.matches_scheduled, 2);
    let matches = h.matches(id).await;
    let semis = round(&matches, 2);
    for m in &semis {
        assert_eq!(m.round_type, RoundType::SemiFinal);
        assert!(m.scheduled_time.unwrap() >= at(11, 0));
    }
    let semis_end = semis
        .iter()
        .map(|m| m.scheduled_time.unwrap() + chrono::Duration::minutes(90))
        .max()
        .unwrap();
    for m in &semis {
        h.engine.record_result(m.id, favourite_wins(m)).await.unwrap();
    }

    h.engine.schedule_matches(id).await.unwrap();
    let matches = h.matches(id).await;
    let final_match = round(&matches, 3)[0];
    assert_eq!(final_match.round_type, RoundType::Final);
    assert!(final_match.scheduled_time.unwrap() >= semis_end);
    assert_eq!(final_match.entrants(), Some((regs[0], regs[1])));
    h.engine
        .record_result(final_match.id, favourite_wins(final_match))
        .await
        .unwrap();

    let summary = h.engine.finalize_rankings(id).await.unwrap();
    assert_eq!(summary.rankings_written, 8);
    assert_eq!(h.status(id).await, TournamentStatus::Completed);

    let rankings = h.rankings(id).await;
    for (seed, registration) in regs.iter().enumerate() {
        assert_eq!(rankings[registration], seed as u32 + 1);
    }
}

#[tokio::test]
async fn test_no_courts_leaves_match_table_unchanged() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::Elimination, 6, courts(0)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    let before = h.matches(id).await;

    let err = h.engine.schedule_matches(id).await.unwrap_err();
    assert!(matches!(err, TournamentError::NoCourtsConfigured(t) if t == id));

    assert_eq!(h.matches(id).await, before);
    assert_eq!(h.status(id).await, TournamentStatus::DrawPublished);
}

#[tokio::test]
async fn test_concurrent_schedule_is_rejected() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::Elimination, 4, courts(2)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();

    let other = h.engine.clone();
    let guard = other.locks().try_acquire(id).expect("guard is free");
    let err = h.engine.schedule_matches(id).await.unwrap_err();
    assert!(matches!(err, TournamentError::ScheduleInProgress(_)));
    assert!(h.matches(id).await.iter().all(|m| m.scheduled_time.is_none()));

    drop(guard);
    let summary = h.engine.schedule_matches(id).await.unwrap();
    assert_eq!(summary.matches_scheduled, 2);
}

#[tokio::test]
async fn test_rescheduling_never_moves_matches() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::Elimination, 16, courts(3)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();

    h.engine.schedule_matches(id).await.unwrap();
    let before = h.matches(id).await;
    let again = h.engine.schedule_matches(id).await.unwrap();
    assert_eq!(again.matches_scheduled, 0);
    assert_eq!(h.matches(id).await, before);
}

#[tokio::test]
async fn test_withdrawal_before_round_two_gives_walkover() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::Elimination, 8, courts(2)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    h.engine.schedule_matches(id).await.unwrap();
    h.play_ready(id).await;

    // Seeds 1 and 4 meet in the first semifinal; seed 4 withdraws.
    let matches = h.matches(id).await;
    let semi = round(&matches, 2)
        .into_iter()
        .find(|m| m.involves(regs[3]))
        .cloned()
        .unwrap();
    assert!(semi.involves(regs[0]));

    let summary = h.engine.withdraw_registration(regs[3]).await.unwrap();
    assert_eq!(summary.walkovers, vec![semi.id]);
    assert!(summary.advanced);

    let semi = h.repo.get_match(semi.id).await.unwrap();
    assert_eq!(semi.status, MatchStatus::Walkover);
    assert_eq!(semi.winner, Some(regs[0]));

    let matches = h.matches(id).await;
    let final_match = round(&matches, 3)[0];
    assert_eq!(final_match.slot(Side::Home), Slot::Entrant(regs[0]));
    assert!(matches!(final_match.slot(Side::Away), Slot::Awaiting(_)));
}

#[tokio::test]
async fn test_withdrawal_resolves_once_opponent_is_known() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::Elimination, 4, courts(2)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    h.engine.schedule_matches(id).await.unwrap();

    // Seed 1 wins their semifinal, then withdraws before the final.
    let matches = h.matches(id).await;
    let (semi_a, semi_b) = (matches[0].clone(), matches[1].clone());
    assert!(semi_a.involves(regs[0]));
    h.engine.record_result(semi_a.id, favourite_wins(&semi_a)).await.unwrap();

    let summary = h.engine.withdraw_registration(regs[0]).await.unwrap();
    assert!(summary.walkovers.is_empty());

    let result = h.engine.record_result(semi_b.id, favourite_wins(&semi_b)).await.unwrap();
    assert_eq!(result.walkovers.len(), 1);

    let final_match = h.repo.get_match(result.walkovers[0]).await.unwrap();
    assert_eq!(final_match.round_type, RoundType::Final);
    assert_eq!(final_match.status, MatchStatus::Walkover);
    assert_eq!(final_match.winner, Some(regs[1]));

    h.engine.finalize_rankings(id).await.unwrap();
    let rankings = h.rankings(id).await;
    assert_eq!(rankings[&regs[1]], 1);
    assert_eq!(rankings[&regs[0]], 2);
}

#[tokio::test]
async fn test_result_errors() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::Elimination, 4, courts(1)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    let matches = h.matches(id).await;
    let final_match = matches.iter().find(|m| m.round_type == RoundType::Final).unwrap();

    let err = h
        .engine
        .record_result(final_match.id, MatchResult::Walkover { winner: Side::Home })
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidSlotState(_)));

    let semi = &matches[0];
    h.engine.record_result(semi.id, favourite_wins(semi)).await.unwrap();
    let err = h
        .engine
        .record_result(semi.id, favourite_wins(semi))
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::MatchAlreadyCompleted(m) if m == semi.id));

    let err = h.engine.finalize_rankings(id).await.unwrap_err();
    assert!(matches!(err, TournamentError::StructureIncomplete { remaining: 2 }));
}

#[tokio::test]
async fn test_conflicting_slot_rolls_back_result() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::Elimination, 4, courts(1)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    let matches = h.matches(id).await;
    let semi = matches[0].clone();
    let final_match = matches.iter().find(|m| m.round_type == RoundType::Final).unwrap();

    // Someone else's entrant already sits in the slot the winner is owed.
    sqlx::query("UPDATE matches SET home_registration_id = ? WHERE id = ?")
        .bind(regs[2])
        .bind(final_match.id)
        .execute(&h.pool)
        .await
        .unwrap();

    let err = h
        .engine
        .record_result(semi.id, favourite_wins(&semi))
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::Inconsistency(_)));

    let semi = h.repo.get_match(semi.id).await.unwrap();
    assert!(!semi.status.is_concluded());
    assert_eq!(semi.winner, None);
}

#[tokio::test]
async fn test_slot_already_holding_the_winner_is_accepted() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::Elimination, 4, courts(1)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    let matches = h.matches(id).await;
    let semi = matches[0].clone();
    let final_match = matches.iter().find(|m| m.round_type == RoundType::Final).unwrap();
    let side = final_match
        .feeders
        .iter()
        .position(|f| f.is_some_and(|source| source.match_id == semi.id))
        .expect("final should be fed by the semi");
    let column = if side == 0 {
        "home_registration_id"
    } else {
        "away_registration_id"
    };
    let (home, away) = semi.entrants().unwrap();
    let winner = home.min(away);

    // A concurrent writer got there first with the same winner.
    sqlx::query(&format!("UPDATE matches SET {column} = ? WHERE id = ?"))
        .bind(winner)
        .bind(final_match.id)
        .execute(&h.pool)
        .await
        .unwrap();

    let summary = h
        .engine
        .record_result(semi.id, favourite_wins(&semi))
        .await
        .unwrap();
    assert!(summary.advanced);

    let semi = h.repo.get_match(semi.id).await.unwrap();
    assert_eq!(semi.winner, Some(winner));
    let final_match = h.repo.get_match(final_match.id).await.unwrap();
    assert_eq!(final_match.slots[side], Slot::Entrant(winner));
}

#[tokio::test]
async fn test_score_contradicting_winner_is_rejected() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::RoundRobin, 3, courts(1)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    let m = h.matches(id).await[0].clone();

    let err = h
        .engine
        .record_result(
            m.id,
            MatchResult::Played {
                winner: Side::Home,
                score: Some(Score::new(0, 6)),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidScore { match_id, .. } if match_id == m.id));
    assert!(err.is_validation());

    let err = h
        .engine
        .record_result(
            m.id,
            MatchResult::Played {
                winner: Side::Away,
                score: Some(Score::new(5, 5)),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidScore { .. }));

    let stored = h.repo.get_match(m.id).await.unwrap();
    assert_eq!(stored, m);
    assert!(!stored.status.is_concluded());
    assert_eq!(stored.winner, None);
    assert_eq!(stored.score, None);
}

#[tokio::test]
async fn test_draw_errors_and_regeneration() {
    let h = setup().await;
    let (lonely, _) = h.tournament(TournamentFormat::Elimination, 1, courts(2)).await;
    let err = h
        .engine
        .generate_draw(lonely, DrawOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InsufficientRegistrations {
            needed: 2,
            current: 1
        }
    ));

    let (id, _) = h.tournament(TournamentFormat::Elimination, 5, courts(2)).await;
    let draw = h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    assert_eq!(draw.matches_created, 4);
    let first_ids: Vec<_> = h.matches(id).await.iter().map(|m| m.id).collect();

    let err = h
        .engine
        .generate_draw(id, DrawOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::DrawAlreadyPublished(_)));

    let forced = DrawOptions {
        force_regenerate: true,
        third_place_match: true,
        ..DrawOptions::default()
    };
    let redraw = h.engine.generate_draw(id, forced).await.unwrap();
    assert_eq!(redraw.matches_created, 5);
    let second_ids: Vec<_> = h.matches(id).await.iter().map(|m| m.id).collect();
    assert_eq!(second_ids.len(), 5);
    assert!(second_ids.iter().all(|m| !first_ids.contains(m)));
}

#[tokio::test]
async fn test_withdrawn_before_draw_is_left_out() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::Elimination, 5, courts(2)).await;
    h.engine.withdraw_registration(regs[2]).await.unwrap();

    let draw = h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    assert_eq!(draw.matches_created, 3);
    assert!(h.matches(id).await.iter().all(|m| !m.involves(regs[2])));

    let registrations = h.repo.list_registrations(id).await.unwrap();
    let seeds: Vec<_> = registrations.iter().map(|r| r.seed_number).collect();
    assert_eq!(seeds, vec![Some(1), Some(2), None, Some(3), Some(4)]);

    h.play_out(id).await;
    h.engine.finalize_rankings(id).await.unwrap();
    let rankings = h.rankings(id).await;
    assert_eq!(rankings.len(), 4);
    assert!(!rankings.contains_key(&regs[2]));
}

#[tokio::test]
async fn test_pools_then_elimination_runs_to_completion() {
    let h = setup().await;
    let (id, regs) = h
        .tournament(TournamentFormat::PoolsThenElimination, 8, courts(4))
        .await;

    let draw = h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    assert_eq!(draw.matches_created, 12);
    assert_eq!(
        draw.bracket_shape,
        BracketShape::Pools {
            pool_sizes: vec![4, 4],
            rounds: 3,
            advance_per_pool: Some(2)
        }
    );
    let registrations = h.repo.list_registrations(id).await.unwrap();
    assert!(registrations.iter().all(|r| r.pool_id.is_some()));

    // Play the pools; the last result creates the knockout.
    let mut knockout_created = 0;
    loop {
        h.engine.schedule_matches(id).await.unwrap();
        let ready: Vec<Match> = h
            .matches(id)
            .await
            .into_iter()
            .filter(|m| m.round_type == RoundType::Pool && !m.status.is_concluded())
            .collect();
        if ready.is_empty() {
            break;
        }
        for m in &ready {
            let summary = h.engine.record_result(m.id, favourite_wins(m)).await.unwrap();
            knockout_created += summary.knockout_matches_created;
        }
    }
    assert_eq!(knockout_created, 3);

    let matches = h.matches(id).await;
    let last_pool_round = matches
        .iter()
        .filter(|m| m.round_type == RoundType::Pool)
        .map(|m| m.round_number)
        .max()
        .unwrap();
    let semis: Vec<_> = matches
        .iter()
        .filter(|m| m.round_type == RoundType::SemiFinal)
        .collect();
    assert_eq!(semis.len(), 2);
    assert!(semis.iter().all(|m| m.round_number == last_pool_round + 1));
    // Pool winners meet the other pool's runner-up.
    assert_eq!(semis[0].entrants(), Some((regs[0], regs[3])));
    assert_eq!(semis[1].entrants(), Some((regs[1], regs[2])));

    h.play_out(id).await;
    h.engine.finalize_rankings(id).await.unwrap();
    let rankings = h.rankings(id).await;
    for (seed, registration) in regs.iter().enumerate() {
        assert_eq!(rankings[registration], seed as u32 + 1);
    }
}

#[tokio::test]
async fn test_round_robin_ranks_by_standings() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::RoundRobin, 5, courts(2)).await;

    let draw = h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    assert_eq!(draw.matches_created, 10);

    h.play_out(id).await;
    let matches = h.matches(id).await;
    assert!(matches.iter().all(|m| m.status == MatchStatus::Completed));

    let summary = h.engine.finalize_rankings(id).await.unwrap();
    assert_eq!(summary.rankings_written, 5);
    let rankings = h.rankings(id).await;
    for (seed, registration) in regs.iter().enumerate() {
        assert_eq!(rankings[registration], seed as u32 + 1);
    }
}

#[tokio::test]
async fn test_third_place_match_decides_third() {
    let h = setup().await;
    let (id, regs) = h.tournament(TournamentFormat::Elimination, 4, courts(2)).await;
    let options = DrawOptions {
        third_place_match: true,
        ..DrawOptions::default()
    };
    assert_eq!(h.engine.generate_draw(id, options).await.unwrap().matches_created, 4);

    h.engine.schedule_matches(id).await.unwrap();
    h.play_ready(id).await;

    // Seed 4 takes the third-place match.
    h.engine.schedule_matches(id).await.unwrap();
    let matches = h.matches(id).await;
    let third = matches
        .iter()
        .find(|m| m.round_type == RoundType::ThirdPlace)
        .unwrap();
    let upset = third.side_of(regs[3]).unwrap();
    h.engine
        .record_result(third.id, MatchResult::Played { winner: upset, score: None })
        .await
        .unwrap();
    h.play_out(id).await;

    h.engine.finalize_rankings(id).await.unwrap();
    let rankings = h.rankings(id).await;
    assert_eq!(rankings[&regs[0]], 1);
    assert_eq!(rankings[&regs[1]], 2);
    assert_eq!(rankings[&regs[3]], 3);
    assert_eq!(rankings[&regs[2]], 4);
}

#[tokio::test]
async fn test_start_match_requires_schedule() {
    let h = setup().await;
    let (id, _) = h.tournament(TournamentFormat::Elimination, 2, courts(1)).await;
    h.engine.generate_draw(id, DrawOptions::default()).await.unwrap();
    let final_match = h.matches(id).await.remove(0);

    let err = h.engine.start_match(final_match.id).await.unwrap_err();
    assert!(matches!(err, TournamentError::MatchNotScheduled(_)));

    h.engine.schedule_matches(id).await.unwrap();
    h.engine.start_match(final_match.id).await.unwrap();
    let started = h.repo.get_match(final_match.id).await.unwrap();
    assert_eq!(started.status, MatchStatus::InProgress);

    h.engine
        .record_result(final_match.id, favourite_wins(&started))
        .await
        .unwrap();
    h.engine.finalize_rankings(id).await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_gating() {
    let h = setup().await;
    let config = TournamentConfig::new("Autumn Ladder", TournamentFormat::Elimination, start_date());
    let id = h.repo.create_tournament(&config).await.unwrap();

    let err = h.engine.close_registration(id).await.unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidTransition {
            from: TournamentStatus::Draft,
            to: TournamentStatus::RegistrationClosed
        }
    ));

    h.engine.open_registration(id).await.unwrap();
    let err = h
        .engine
        .generate_draw(id, DrawOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidStatus { .. }));

    h.engine.cancel_tournament(id).await.unwrap();
    assert_eq!(h.status(id).await, TournamentStatus::Canceled);
    assert!(h.engine.cancel_tournament(id).await.is_err());

    let err = h.engine.schedule_matches(id).await.unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidStatus {
            actual: TournamentStatus::Canceled,
            ..
        }
    ));
}
