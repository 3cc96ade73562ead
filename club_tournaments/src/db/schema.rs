//! SQLite schema, applied when the pool is created.
//!
//! A match slot is stored as a registration column plus a source
//! reference pair. The source is kept after the registration is filled in
//! so the bracket structure can be rebuilt after a restart.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tournaments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    format TEXT NOT NULL
        CHECK (format IN ('elimination', 'pools_then_elimination', 'round_robin')),
    status TEXT NOT NULL DEFAULT 'draft',
    start_date TEXT NOT NULL,
    end_date TEXT,
    available_courts INTEGER NOT NULL CHECK (available_courts >= 0),
    open_time TEXT NOT NULL,
    close_time TEXT NOT NULL,
    match_duration_minutes INTEGER NOT NULL CHECK (match_duration_minutes > 0),
    min_registrations INTEGER NOT NULL DEFAULT 2 CHECK (min_registrations >= 2),
    draw_settings TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS registrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tournament_id INTEGER NOT NULL REFERENCES tournaments (id) ON DELETE CASCADE,
    player_one TEXT NOT NULL,
    player_two TEXT,
    seed_number INTEGER CHECK (seed_number > 0),
    pool_id INTEGER,
    final_ranking INTEGER CHECK (final_ranking > 0),
    withdrawn BOOLEAN NOT NULL DEFAULT FALSE,
    registered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_registrations_tournament
    ON registrations (tournament_id);

CREATE UNIQUE INDEX IF NOT EXISTS idx_registrations_final_ranking
    ON registrations (tournament_id, final_ranking)
    WHERE final_ranking IS NOT NULL;

CREATE TABLE IF NOT EXISTS matches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tournament_id INTEGER NOT NULL REFERENCES tournaments (id) ON DELETE CASCADE,
    phase TEXT NOT NULL CHECK (phase IN ('pool', 'elimination')),
    round_type TEXT NOT NULL,
    round_number INTEGER NOT NULL,
    match_order INTEGER NOT NULL,
    pool_id INTEGER,
    home_registration_id INTEGER REFERENCES registrations (id),
    home_source_match_id INTEGER REFERENCES matches (id) ON DELETE CASCADE,
    home_source_outcome TEXT CHECK (home_source_outcome IN ('winner', 'loser')),
    away_registration_id INTEGER REFERENCES registrations (id),
    away_source_match_id INTEGER REFERENCES matches (id) ON DELETE CASCADE,
    away_source_outcome TEXT CHECK (away_source_outcome IN ('winner', 'loser')),
    status TEXT NOT NULL DEFAULT 'unresolved',
    winner_registration_id INTEGER REFERENCES registrations (id),
    home_score INTEGER,
    away_score INTEGER,
    scheduled_time TEXT,
    court INTEGER,
    CHECK (home_registration_id IS NOT NULL OR home_source_match_id IS NOT NULL),
    CHECK (away_registration_id IS NOT NULL OR away_source_match_id IS NOT NULL),
    CHECK ((scheduled_time IS NULL) = (court IS NULL))
);

CREATE INDEX IF NOT EXISTS idx_matches_tournament
    ON matches (tournament_id, round_number, match_order);

CREATE INDEX IF NOT EXISTS idx_matches_home_source
    ON matches (home_source_match_id, home_source_outcome);

CREATE INDEX IF NOT EXISTS idx_matches_away_source
    ON matches (away_source_match_id, away_source_outcome);
"#;
