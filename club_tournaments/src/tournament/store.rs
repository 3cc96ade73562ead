//! Row mapping and statements for the engine tables.
//!
//! Every function runs on the caller's connection, so one engine operation
//! can put all of its reads and writes inside a single transaction.

use super::draw::{DrawPlan, PlannedSlot};
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    CourtConfig, DrawSettings, Match, MatchId, MatchPhase, MatchStatus, NewRegistration, Outcome,
    Registration, RegistrationId, RoundType, Score, Side, Slot, SlotSource, TournamentConfig,
    TournamentFormat, TournamentId, TournamentInfo, TournamentStatus,
};
use super::scheduler::CourtAssignment;
use crate::db::timeouts::{RetryPolicy, with_default_timeout};
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnection, SqliteRow};

macro_rules! tournament_columns {
    () => {
        "id, name, format, status, start_date, end_date, available_courts, open_time, \
         close_time, match_duration_minutes, min_registrations, draw_settings, version, created_at"
    };
}

macro_rules! registration_columns {
    () => {
        "id, tournament_id, player_one, player_two, seed_number, pool_id, final_ranking, \
         withdrawn, registered_at"
    };
}

macro_rules! match_columns {
    () => {
        "id, tournament_id, phase, round_type, round_number, match_order, pool_id, \
         home_registration_id, home_source_match_id, home_source_outcome, \
         away_registration_id, away_source_match_id, away_source_outcome, \
         status, winner_registration_id, home_score, away_score, scheduled_time, court"
    };
}

/// Registration, source match and source outcome columns of a slot
fn slot_columns(side: Side) -> [&'static str; 3] {
    match side {
        Side::Home => [
            "home_registration_id",
            "home_source_match_id",
            "home_source_outcome",
        ],
        Side::Away => [
            "away_registration_id",
            "away_source_match_id",
            "away_source_outcome",
        ],
    }
}

fn parse_column<T>(column: &str, value: &str, parse: fn(&str) -> Option<T>) -> TournamentResult<T> {
    parse(value).ok_or_else(|| {
        TournamentError::Inconsistency(format!("unexpected {column} value {value:?}"))
    })
}

fn to_u32(column: &str, value: i64) -> TournamentResult<u32> {
    u32::try_from(value).map_err(|_| {
        TournamentError::Inconsistency(format!("{column} out of range: {value}"))
    })
}

fn optional_u32(column: &str, value: Option<i64>) -> TournamentResult<Option<u32>> {
    value.map(|v| to_u32(column, v)).transpose()
}

fn tournament_from_row(row: &SqliteRow) -> TournamentResult<TournamentInfo> {
    let format: String = row.get("format");
    let status: String = row.get("status");
    let draw_settings = row
        .get::<Option<String>, _>("draw_settings")
        .map(|json| serde_json::from_str::<DrawSettings>(&json))
        .transpose()?;

    Ok(TournamentInfo {
        id: row.get("id"),
        name: row.get("name"),
        format: parse_column("format", &format, TournamentFormat::parse)?,
        status: parse_column("status", &status, TournamentStatus::parse)?,
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        courts: CourtConfig::new(
            to_u32("available_courts", row.get("available_courts"))?,
            row.get("open_time"),
            row.get("close_time"),
            to_u32("match_duration_minutes", row.get("match_duration_minutes"))?,
        ),
        min_registrations: to_u32("min_registrations", row.get("min_registrations"))?,
        draw_settings,
        version: row.get("version"),
        created_at: row.get("created_at"),
    })
}

fn registration_from_row(row: &SqliteRow) -> TournamentResult<Registration> {
    Ok(Registration {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        player_one: row.get("player_one"),
        player_two: row.get("player_two"),
        seed_number: optional_u32("seed_number", row.get("seed_number"))?,
        pool_id: optional_u32("pool_id", row.get("pool_id"))?,
        final_ranking: optional_u32("final_ranking", row.get("final_ranking"))?,
        withdrawn: row.get("withdrawn"),
        registered_at: row.get("registered_at"),
    })
}

fn slot_from_row(
    row: &SqliteRow,
    match_id: MatchId,
    side: Side,
) -> TournamentResult<(Slot, Option<SlotSource>)> {
    let [registration_col, source_col, outcome_col] = slot_columns(side);
    let registration: Option<RegistrationId> = row.get(registration_col);
    let source_match: Option<MatchId> = row.get(source_col);
    let outcome: Option<String> = row.get(outcome_col);

    let feeder = match (source_match, outcome) {
        (Some(source), Some(outcome)) => Some(SlotSource {
            match_id: source,
            outcome: parse_column(outcome_col, &outcome, Outcome::parse)?,
        }),
        _ => None,
    };

    let slot = match (registration, feeder) {
        (Some(id), _) => Slot::Entrant(id),
        (None, Some(source)) => Slot::Awaiting(source),
        (None, None) => {
            return Err(TournamentError::Inconsistency(format!(
                "match {match_id} has an empty {side:?} slot"
            )));
        }
    };
    Ok((slot, feeder))
}

fn match_from_row(row: &SqliteRow) -> TournamentResult<Match> {
    let id: MatchId = row.get("id");
    let phase: String = row.get("phase");
    let round_type: String = row.get("round_type");
    let status: String = row.get("status");
    let (home, home_feeder) = slot_from_row(row, id, Side::Home)?;
    let (away, away_feeder) = slot_from_row(row, id, Side::Away)?;

    let score = match (
        row.get::<Option<i64>, _>("home_score"),
        row.get::<Option<i64>, _>("away_score"),
    ) {
        (Some(home), Some(away)) => Some(Score::new(
            to_u32("home_score", home)?,
            to_u32("away_score", away)?,
        )),
        _ => None,
    };

    Ok(Match {
        id,
        tournament_id: row.get("tournament_id"),
        phase: parse_column("phase", &phase, MatchPhase::parse)?,
        round_type: parse_column("round_type", &round_type, RoundType::parse)?,
        round_number: to_u32("round_number", row.get("round_number"))?,
        match_order: to_u32("match_order", row.get("match_order"))?,
        pool_id: optional_u32("pool_id", row.get("pool_id"))?,
        slots: [home, away],
        feeders: [home_feeder, away_feeder],
        status: parse_column("status", &status, MatchStatus::parse)?,
        winner: row.get("winner_registration_id"),
        score,
        scheduled_time: row.get("scheduled_time"),
        court: optional_u32("court", row.get("court"))?,
    })
}

pub async fn insert_tournament(
    conn: &mut SqliteConnection,
    config: &TournamentConfig,
) -> TournamentResult<TournamentId> {
    let row = sqlx::query(
        r#"
        INSERT INTO tournaments (name, format, status, start_date, end_date, available_courts,
                                 open_time, close_time, match_duration_minutes,
                                 min_registrations, version, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
        RETURNING id
        "#,
    )
    .bind(&config.name)
    .bind(config.format.as_str())
    .bind(TournamentStatus::Draft.as_str())
    .bind(config.start_date)
    .bind(config.end_date)
    .bind(i64::from(config.courts.available_courts))
    .bind(config.courts.open_time)
    .bind(config.courts.close_time)
    .bind(i64::from(config.courts.match_duration_minutes))
    .bind(i64::from(config.min_registrations))
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get("id"))
}

pub async fn insert_registration(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    entry: &NewRegistration,
) -> TournamentResult<RegistrationId> {
    let row = sqlx::query(
        r#"
        INSERT INTO registrations (tournament_id, player_one, player_two, seed_number, registered_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(tournament_id)
    .bind(&entry.player_one)
    .bind(&entry.player_two)
    .bind(entry.seed_number.map(i64::from))
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.get("id"))
}

pub async fn load_tournament(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
) -> TournamentResult<TournamentInfo> {
    let row = with_default_timeout(
        sqlx::query(concat!("SELECT ", tournament_columns!(), " FROM tournaments WHERE id = ?"))
            .bind(tournament_id)
            .fetch_optional(&mut *conn),
    )
    .await?
    .ok_or(TournamentError::NotFound(tournament_id))?;

    tournament_from_row(&row)
}

pub async fn load_registrations(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
) -> TournamentResult<Vec<Registration>> {
    let rows = with_default_timeout(
        sqlx::query(concat!(
            "SELECT ",
            registration_columns!(),
            " FROM registrations WHERE tournament_id = ? ORDER BY id"
        ))
        .bind(tournament_id)
        .fetch_all(&mut *conn),
    )
    .await?;

    rows.iter().map(registration_from_row).collect()
}

pub async fn load_registration(
    conn: &mut SqliteConnection,
    registration_id: RegistrationId,
) -> TournamentResult<Registration> {
    let row = with_default_timeout(
        sqlx::query(concat!("SELECT ", registration_columns!(), " FROM registrations WHERE id = ?"))
            .bind(registration_id)
            .fetch_optional(&mut *conn),
    )
    .await?
    .ok_or(TournamentError::RegistrationNotFound(registration_id))?;

    registration_from_row(&row)
}

pub async fn load_matches(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
) -> TournamentResult<Vec<Match>> {
    let rows = with_default_timeout(
        sqlx::query(concat!(
            "SELECT ",
            match_columns!(),
            " FROM matches WHERE tournament_id = ? ORDER BY round_number, match_order, id"
        ))
        .bind(tournament_id)
        .fetch_all(&mut *conn),
    )
    .await?;

    rows.iter().map(match_from_row).collect()
}

pub async fn load_match(conn: &mut SqliteConnection, match_id: MatchId) -> TournamentResult<Match> {
    let row = with_default_timeout(
        sqlx::query(concat!("SELECT ", match_columns!(), " FROM matches WHERE id = ?"))
            .bind(match_id)
            .fetch_optional(&mut *conn),
    )
    .await?
    .ok_or(TournamentError::MatchNotFound(match_id))?;

    match_from_row(&row)
}

pub async fn count_matches(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
) -> TournamentResult<usize> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM matches WHERE tournament_id = ?")
        .bind(tournament_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.get::<i64, _>("total") as usize)
}

pub async fn delete_matches(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
) -> TournamentResult<u64> {
    let result = sqlx::query("DELETE FROM matches WHERE tournament_id = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Rewrite seeds to the draw order and record pool membership. Entrants
/// left out of the draw lose any seed they had.
pub async fn freeze_draw(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    ranked: &[RegistrationId],
    pools: &[Vec<RegistrationId>],
) -> TournamentResult<()> {
    sqlx::query(
        "UPDATE registrations SET seed_number = NULL, pool_id = NULL, final_ranking = NULL
         WHERE tournament_id = ?",
    )
    .bind(tournament_id)
    .execute(&mut *conn)
    .await?;

    for (idx, registration_id) in ranked.iter().enumerate() {
        sqlx::query("UPDATE registrations SET seed_number = ? WHERE id = ?")
            .bind(idx as i64 + 1)
            .bind(registration_id)
            .execute(&mut *conn)
            .await?;
    }

    for (idx, members) in pools.iter().enumerate() {
        for registration_id in members {
            sqlx::query("UPDATE registrations SET pool_id = ? WHERE id = ?")
                .bind(idx as i64 + 1)
                .bind(registration_id)
                .execute(&mut *conn)
                .await?;
        }
    }
    Ok(())
}

pub async fn save_draw_settings(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    settings: &DrawSettings,
) -> TournamentResult<()> {
    sqlx::query("UPDATE tournaments SET draw_settings = ? WHERE id = ?")
        .bind(serde_json::to_string(settings)?)
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

type SlotValues = (Option<RegistrationId>, Option<MatchId>, Option<&'static str>);

fn planned_slot_values(slot: PlannedSlot, inserted: &[MatchId]) -> TournamentResult<SlotValues> {
    let source = |idx: usize| {
        inserted.get(idx).copied().ok_or_else(|| {
            TournamentError::Inconsistency(format!("draw plan references match #{idx} before it exists"))
        })
    };
    Ok(match slot {
        PlannedSlot::Entrant(id) => (Some(id), None, None),
        PlannedSlot::WinnerOf(idx) => (None, Some(source(idx)?), Some(Outcome::Winner.as_str())),
        PlannedSlot::LoserOf(idx) => (None, Some(source(idx)?), Some(Outcome::Loser.as_str())),
    })
}

/// Insert a plan in order; returns the row id of each planned match
pub async fn insert_plan(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    plan: &DrawPlan,
) -> TournamentResult<Vec<MatchId>> {
    let mut ids = Vec::with_capacity(plan.matches.len());
    for planned in &plan.matches {
        let (home_reg, home_src, home_outcome) = planned_slot_values(planned.slots[0], &ids)?;
        let (away_reg, away_src, away_outcome) = planned_slot_values(planned.slots[1], &ids)?;

        let row = sqlx::query(
            r#"
            INSERT INTO matches (tournament_id, phase, round_type, round_number, match_order, pool_id,
                                 home_registration_id, home_source_match_id, home_source_outcome,
                                 away_registration_id, away_source_match_id, away_source_outcome,
                                 status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(tournament_id)
        .bind(planned.phase.as_str())
        .bind(planned.round_type.label())
        .bind(i64::from(planned.round_number))
        .bind(i64::from(planned.match_order))
        .bind(planned.pool_id.map(i64::from))
        .bind(home_reg)
        .bind(home_src)
        .bind(home_outcome)
        .bind(away_reg)
        .bind(away_src)
        .bind(away_outcome)
        .bind(MatchStatus::Unresolved.as_str())
        .fetch_one(&mut *conn)
        .await?;

        ids.push(row.get("id"));
    }
    Ok(ids)
}

/// Compare-and-swap on the status column
pub async fn set_status(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    from: TournamentStatus,
    to: TournamentStatus,
) -> TournamentResult<()> {
    let result = sqlx::query("UPDATE tournaments SET status = ? WHERE id = ? AND status = ?")
        .bind(to.as_str())
        .bind(tournament_id)
        .bind(from.as_str())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(TournamentError::InvalidTransition { from, to });
    }
    Ok(())
}

/// Claim the tournament for this writer. Fails if another writer committed
/// since `expected` was read.
pub async fn bump_version(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    expected: i64,
) -> TournamentResult<()> {
    let result = sqlx::query("UPDATE tournaments SET version = version + 1 WHERE id = ? AND version = ?")
        .bind(tournament_id)
        .bind(expected)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        log::warn!(
            "Tournament {} version moved past {} during scheduling",
            tournament_id,
            expected
        );
        return Err(TournamentError::ScheduleInProgress(tournament_id));
    }
    Ok(())
}

/// Write one court assignment unless the match was scheduled meanwhile.
/// Busy or locked errors are retried per `policy`.
pub async fn write_assignment(
    conn: &mut SqliteConnection,
    assignment: &CourtAssignment,
    policy: &RetryPolicy,
) -> TournamentResult<bool> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = sqlx::query(
            "UPDATE matches SET scheduled_time = ?, court = ?, status = ?
             WHERE id = ? AND scheduled_time IS NULL",
        )
        .bind(assignment.scheduled_time)
        .bind(i64::from(assignment.court))
        .bind(MatchStatus::Scheduled.as_str())
        .bind(assignment.match_id)
        .execute(&mut *conn)
        .await;

        match outcome {
            Ok(result) => return Ok(result.rows_affected() == 1),
            Err(e) if policy.should_retry(attempt, &e) => {
                log::warn!(
                    "Retrying schedule write for match {} (attempt {}): {}",
                    assignment.match_id,
                    attempt,
                    e
                );
                tokio::time::sleep(policy.delay(attempt)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Conclude a match. Returns false if it was not open any more.
pub async fn complete_match(
    conn: &mut SqliteConnection,
    match_id: MatchId,
    winner: RegistrationId,
    status: MatchStatus,
    score: Option<Score>,
) -> TournamentResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE matches
        SET status = ?, winner_registration_id = ?, home_score = ?, away_score = ?
        WHERE id = ? AND status IN ('unresolved', 'scheduled', 'in_progress')
        "#,
    )
    .bind(status.as_str())
    .bind(winner)
    .bind(score.map(|s| i64::from(s.home)))
    .bind(score.map(|s| i64::from(s.away)))
    .bind(match_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn mark_in_progress(conn: &mut SqliteConnection, match_id: MatchId) -> TournamentResult<bool> {
    let result = sqlx::query("UPDATE matches SET status = ? WHERE id = ? AND status = ?")
        .bind(MatchStatus::InProgress.as_str())
        .bind(match_id)
        .bind(MatchStatus::Scheduled.as_str())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Fill every empty slot fed by `source` with `registration`.
///
/// Returns all matches whose slot now holds `registration`, including ones
/// filled by an earlier call. A slot holding anyone else is an
/// inconsistency and nothing is overwritten.
pub async fn fill_slots(
    conn: &mut SqliteConnection,
    source: SlotSource,
    registration: RegistrationId,
) -> TournamentResult<Vec<MatchId>> {
    let mut filled = Vec::new();
    for side in [Side::Home, Side::Away] {
        let [registration_col, source_col, outcome_col] = slot_columns(side);

        let update = format!(
            "UPDATE matches SET {registration_col} = ?
             WHERE {source_col} = ? AND {outcome_col} = ? AND {registration_col} IS NULL"
        );
        sqlx::query(&update)
            .bind(registration)
            .bind(source.match_id)
            .bind(source.outcome.as_str())
            .execute(&mut *conn)
            .await?;

        let select = format!(
            "SELECT id, {registration_col} AS held FROM matches
             WHERE {source_col} = ? AND {outcome_col} = ?"
        );
        let rows = sqlx::query(&select)
            .bind(source.match_id)
            .bind(source.outcome.as_str())
            .fetch_all(&mut *conn)
            .await?;

        for row in rows {
            let id: MatchId = row.get("id");
            let held: Option<RegistrationId> = row.get("held");
            if held != Some(registration) {
                log::error!(
                    "Match {} {:?} slot holds {:?}, expected {} from match {}",
                    id,
                    side,
                    held,
                    registration,
                    source.match_id
                );
                return Err(TournamentError::Inconsistency(format!(
                    "match {id} {side:?} slot holds {held:?}, expected {registration}"
                )));
            }
            filled.push(id);
        }
    }
    Ok(filled)
}

pub async fn set_withdrawn(
    conn: &mut SqliteConnection,
    registration_id: RegistrationId,
) -> TournamentResult<bool> {
    let result = sqlx::query("UPDATE registrations SET withdrawn = TRUE WHERE id = ? AND withdrawn = FALSE")
        .bind(registration_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn write_rankings(
    conn: &mut SqliteConnection,
    tournament_id: TournamentId,
    rankings: &[(RegistrationId, u32)],
) -> TournamentResult<()> {
    sqlx::query("UPDATE registrations SET final_ranking = NULL WHERE tournament_id = ?")
        .bind(tournament_id)
        .execute(&mut *conn)
        .await?;

    for (registration_id, rank) in rankings {
        sqlx::query("UPDATE registrations SET final_ranking = ? WHERE id = ? AND tournament_id = ?")
            .bind(i64::from(*rank))
            .bind(registration_id)
            .bind(tournament_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
