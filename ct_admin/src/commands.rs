//! Command parsing and execution.
//!
//! Each invocation runs exactly one engine or repository operation.

use anyhow::{anyhow, bail};
use chrono::{NaiveDate, NaiveTime};
use club_tournaments::TournamentResult;
use club_tournaments::db::TournamentRepository;
use club_tournaments::tournament::{
    CourtConfig, DrawOptions, Match, MatchId, MatchResult, NewRegistration, Outcome,
    RegistrationId, Score, Side, Slot, TournamentConfig, TournamentEngine, TournamentFormat,
    TournamentId,
};
use pico_args::Arguments;
use serde_json::{Value, json};

/// One operation requested on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create(TournamentConfig),
    Register {
        tournament_id: TournamentId,
        entry: NewRegistration,
    },
    Open(TournamentId),
    Close(TournamentId),
    Cancel(TournamentId),
    Draw {
        tournament_id: TournamentId,
        options: DrawOptions,
    },
    Schedule(TournamentId),
    Start(MatchId),
    Result {
        match_id: MatchId,
        result: MatchResult,
    },
    Withdraw(RegistrationId),
    Finalize(TournamentId),
    Show(TournamentId),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create(_) => "create",
            Command::Register { .. } => "register",
            Command::Open(_) => "open",
            Command::Close(_) => "close",
            Command::Cancel(_) => "cancel",
            Command::Draw { .. } => "draw",
            Command::Schedule(_) => "schedule",
            Command::Start(_) => "start",
            Command::Result { .. } => "result",
            Command::Withdraw(_) => "withdraw",
            Command::Finalize(_) => "finalize",
            Command::Show(_) => "show",
        }
    }

    /// Id the command acts on, if it names one
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Command::Create(_) => None,
            Command::Register { tournament_id, .. } | Command::Draw { tournament_id, .. } => {
                Some(*tournament_id)
            }
            Command::Result { match_id, .. } => Some(*match_id),
            Command::Open(id)
            | Command::Close(id)
            | Command::Cancel(id)
            | Command::Schedule(id)
            | Command::Start(id)
            | Command::Withdraw(id)
            | Command::Finalize(id)
            | Command::Show(id) => Some(*id),
        }
    }
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: Command,
    pub database_url: Option<String>,
    pub json: bool,
}

fn parse_format(value: &str) -> Result<TournamentFormat, String> {
    TournamentFormat::parse(value).ok_or_else(|| {
        format!("unknown format '{value}' (elimination, pools_then_elimination, round_robin)")
    })
}

fn parse_time(value: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(value, "%H:%M")
}

fn parse_side(value: &str) -> Result<Side, String> {
    Side::parse(value).ok_or_else(|| format!("winner must be 'home' or 'away', got '{value}'"))
}

fn parse_score(value: &str) -> Result<Score, String> {
    let (home, away) = value
        .split_once('-')
        .ok_or_else(|| format!("score must look like 6-3, got '{value}'"))?;
    let games = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|_| format!("'{part}' is not a game count"))
    };
    Ok(Score::new(games(home)?, games(away)?))
}

/// Parse the command line (without the program name)
pub fn parse(mut pargs: Arguments) -> anyhow::Result<Invocation> {
    let Some(name) = pargs.subcommand()? else {
        bail!("no command given, see --help");
    };
    let json = pargs.contains("--json");
    let database_url: Option<String> = pargs.opt_value_from_str("--db-url")?;

    let command = match name.as_str() {
        "create" => {
            let name: String = pargs.value_from_str("--name")?;
            let format = pargs.value_from_fn("--format", parse_format)?;
            let start: NaiveDate = pargs.value_from_str("--start")?;
            let mut config = TournamentConfig::new(name, format, start);

            if let Some(end) = pargs.opt_value_from_str("--end")? {
                config = config.with_end_date(end);
            }
            if let Some(min) = pargs.opt_value_from_str("--min-registrations")? {
                config = config.with_min_registrations(min);
            }
            let defaults = CourtConfig::default();
            config = config.with_courts(CourtConfig::new(
                pargs
                    .opt_value_from_str("--courts")?
                    .unwrap_or(defaults.available_courts),
                pargs
                    .opt_value_from_fn("--open", parse_time)?
                    .unwrap_or(defaults.open_time),
                pargs
                    .opt_value_from_fn("--close", parse_time)?
                    .unwrap_or(defaults.close_time),
                pargs
                    .opt_value_from_str("--duration")?
                    .unwrap_or(defaults.match_duration_minutes),
            ));
            Command::Create(config)
        }
        "register" => {
            let player: String = pargs.value_from_str("--player")?;
            let partner: Option<String> = pargs.opt_value_from_str("--partner")?;
            let seed: Option<u32> = pargs.opt_value_from_str("--seed")?;
            let mut entry = match partner {
                Some(partner) => NewRegistration::pair(player, partner),
                None => NewRegistration::single(player),
            };
            if let Some(seed) = seed {
                entry = entry.seeded(seed);
            }
            Command::Register {
                tournament_id: pargs.free_from_str()?,
                entry,
            }
        }
        "draw" => {
            let options = DrawOptions {
                force_regenerate: pargs.contains("--force"),
                third_place_match: pargs.contains("--third-place"),
                pool_size: pargs.opt_value_from_str("--pool-size")?,
                advance_per_pool: pargs.opt_value_from_str("--advance")?,
                rng_seed: pargs.opt_value_from_str("--rng-seed")?,
            };
            Command::Draw {
                tournament_id: pargs.free_from_str()?,
                options,
            }
        }
        "result" => {
            let winner = pargs.value_from_fn("--winner", parse_side)?;
            let walkover = pargs.contains("--walkover");
            let score = pargs.opt_value_from_fn("--score", parse_score)?;
            let result = match (walkover, score) {
                (true, Some(_)) => bail!("a walkover has no score"),
                (true, None) => MatchResult::Walkover { winner },
                (false, score) => MatchResult::Played { winner, score },
            };
            Command::Result {
                match_id: pargs.free_from_str()?,
                result,
            }
        }
        "open" => Command::Open(pargs.free_from_str()?),
        "close" => Command::Close(pargs.free_from_str()?),
        "cancel" => Command::Cancel(pargs.free_from_str()?),
        "schedule" => Command::Schedule(pargs.free_from_str()?),
        "start" => Command::Start(pargs.free_from_str()?),
        "withdraw" => Command::Withdraw(pargs.free_from_str()?),
        "finalize" => Command::Finalize(pargs.free_from_str()?),
        "show" => Command::Show(pargs.free_from_str()?),
        other => bail!("unknown command '{other}', see --help"),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        return Err(anyhow!("unexpected arguments: {remaining:?}"));
    }

    Ok(Invocation {
        command,
        database_url,
        json,
    })
}

/// Outcome of a command, rendered as text or JSON
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub json: Value,
}

fn slot_label(slot: Slot) -> String {
    match slot {
        Slot::Entrant(id) => format!("reg {id}"),
        Slot::Awaiting(source) => match source.outcome {
            Outcome::Winner => format!("winner of #{}", source.match_id),
            Outcome::Loser => format!("loser of #{}", source.match_id),
        },
    }
}

fn match_line(m: &Match) -> String {
    let when = match (m.scheduled_time, m.court) {
        (Some(time), Some(court)) => format!("{} court {}", time.format("%Y-%m-%d %H:%M"), court + 1),
        _ => "unscheduled".to_string(),
    };
    format!(
        "#{} r{} {} {} v {} [{}] {}",
        m.id,
        m.round_number,
        m.round_type,
        slot_label(m.slot(Side::Home)),
        slot_label(m.slot(Side::Away)),
        m.status.as_str(),
        when
    )
}

/// Run one command against the engine and repository
pub async fn execute<R: TournamentRepository>(
    command: Command,
    engine: &TournamentEngine,
    repo: &R,
) -> TournamentResult<Report> {
    let report = match command {
        Command::Create(config) => {
            let id = repo.create_tournament(&config).await?;
            Report {
                text: format!("Created tournament {} '{}'", id, config.name),
                json: json!({ "tournament_id": id }),
            }
        }
        Command::Register {
            tournament_id,
            entry,
        } => {
            let id = repo.register_entry(tournament_id, &entry).await?;
            Report {
                text: format!("Registered {} as registration {}", entry.player_one, id),
                json: json!({ "registration_id": id }),
            }
        }
        Command::Open(id) => {
            engine.open_registration(id).await?;
            status_report(id, "registration open")
        }
        Command::Close(id) => {
            engine.close_registration(id).await?;
            status_report(id, "registration closed")
        }
        Command::Cancel(id) => {
            engine.cancel_tournament(id).await?;
            status_report(id, "canceled")
        }
        Command::Draw {
            tournament_id,
            options,
        } => {
            let summary = engine.generate_draw(tournament_id, options).await?;
            Report {
                text: format!(
                    "Draw published: {} match(es), {:?}",
                    summary.matches_created, summary.bracket_shape
                ),
                json: serde_json::to_value(&summary)?,
            }
        }
        Command::Schedule(id) => {
            let summary = engine.schedule_matches(id).await?;
            let mut text = format!(
                "Scheduled {} match(es) on {} court(s)",
                summary.matches_scheduled, summary.courts_used
            );
            if let (Some(start), Some(end)) = (summary.start_date, summary.ends_at) {
                text.push_str(&format!(", {start} to {end}"));
            }
            if summary.overruns_end_date {
                text.push_str(" (past the tournament end date)");
            }
            Report {
                text,
                json: serde_json::to_value(&summary)?,
            }
        }
        Command::Start(id) => {
            engine.start_match(id).await?;
            Report {
                text: format!("Match {id} started"),
                json: json!({ "match_id": id, "status": "in_progress" }),
            }
        }
        Command::Result { match_id, result } => {
            let summary = engine.record_result(match_id, result).await?;
            Report {
                text: format!(
                    "Result recorded; {} match(es) ready, {} walkover(s), {} knockout match(es) created",
                    summary.ready_matches.len(),
                    summary.walkovers.len(),
                    summary.knockout_matches_created
                ),
                json: serde_json::to_value(&summary)?,
            }
        }
        Command::Withdraw(id) => {
            let summary = engine.withdraw_registration(id).await?;
            Report {
                text: format!(
                    "Registration {} withdrawn, {} walkover(s)",
                    id,
                    summary.walkovers.len()
                ),
                json: serde_json::to_value(&summary)?,
            }
        }
        Command::Finalize(id) => {
            let summary = engine.finalize_rankings(id).await?;
            Report {
                text: format!("Tournament {} completed, {} ranking(s)", id, summary.rankings_written),
                json: serde_json::to_value(&summary)?,
            }
        }
        Command::Show(id) => {
            let tournament = repo.get_tournament(id).await?;
            let registrations = repo.list_registrations(id).await?;
            let matches = repo.list_matches(id).await?;

            let mut lines = vec![format!(
                "{} '{}' ({}, {}) from {}",
                tournament.id,
                tournament.name,
                tournament.format,
                tournament.status,
                tournament.start_date
            )];
            for r in &registrations {
                lines.push(format!(
                    "  reg {} {} seed {:?} rank {:?}{}",
                    r.id,
                    r.display_name(),
                    r.seed_number,
                    r.final_ranking,
                    if r.withdrawn { " (withdrawn)" } else { "" }
                ));
            }
            lines.extend(matches.iter().map(|m| format!("  {}", match_line(m))));

            Report {
                text: lines.join("\n"),
                json: json!({
                    "tournament": tournament,
                    "registrations": registrations,
                    "matches": matches,
                }),
            }
        }
    };
    Ok(report)
}

fn status_report(id: TournamentId, status: &str) -> Report {
    Report {
        text: format!("Tournament {id} {status}"),
        json: json!({ "tournament_id": id, "status": status }),
    }
}
