//! Operator command line for club tournaments.
//!
//! Connects to the tournament database and runs one engine operation:
//! draw generation, scheduling, results, withdrawals or final rankings.

mod commands;
mod config;
mod logging;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Error;
use club_tournaments::db::{Database, SqliteTournamentRepository};
use club_tournaments::tournament::TournamentEngine;
use pico_args::Arguments;

use crate::config::AdminConfig;

const HELP: &str = "\
Manage club tournaments: draws, court schedules, results and rankings

USAGE:
  ct_admin <COMMAND> [OPTIONS] [ID]

COMMANDS:
  create   --name NAME --format FORMAT --start YYYY-MM-DD
           [--end YYYY-MM-DD] [--courts N] [--open HH:MM] [--close HH:MM]
           [--duration MINUTES] [--min-registrations N]
  register --player NAME [--partner NAME] [--seed N] TOURNAMENT_ID
  open | close | cancel TOURNAMENT_ID
  draw     [--force] [--pool-size N] [--advance N] [--third-place]
           [--rng-seed N] TOURNAMENT_ID
  schedule TOURNAMENT_ID
  start    MATCH_ID
  result   --winner home|away [--score H-A] [--walkover] MATCH_ID
  withdraw REGISTRATION_ID
  finalize TOURNAMENT_ID
  show     TOURNAMENT_ID

FORMATS:
  elimination, pools_then_elimination, round_robin

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL or sqlite://club_tournaments.db]
  --json                   Print the result as JSON

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL                 SQLite connection string
  DB_MAX_CONNECTIONS           Pool size
  SCHEDULE_WRITE_RETRIES       Retries for a busy database while scheduling
  SCHEDULE_RETRY_BACKOFF_MS    Backoff before the first retry
  RUST_LOG                     Log filter [default: info,sqlx=warn]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let invocation = commands::parse(pargs)?;
    logging::init();

    let config = AdminConfig::from_env(invocation.database_url.clone());
    config.validate()?;

    tracing::debug!("Connecting to database: {}", config.database.database_url);
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    let engine = TournamentEngine::with_config(Arc::new(db.pool().clone()), config.engine);
    let repo = SqliteTournamentRepository::new(db.pool().clone());

    let name = invocation.command.name();
    let target = invocation.command.target_id();
    let started = Instant::now();
    let outcome = commands::execute(invocation.command, &engine, &repo).await;
    logging::log_operation(name, target, started.elapsed().as_millis() as u64);
    db.close().await;

    match outcome {
        Ok(report) if invocation.json => {
            println!("{}", serde_json::to_string_pretty(&report.json)?);
        }
        Ok(report) => println!("{}", report.text),
        Err(e) if e.is_validation() => {
            tracing::warn!(command = name, "Rejected: {}", e);
            eprintln!("{}: {}", name, e);
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(command = name, "Failed: {}", e);
            return Err(anyhow::anyhow!("{} failed: {}", name, e.client_message()));
        }
    }

    Ok(())
}
