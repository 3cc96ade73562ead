//! Tournament data models: registrations, matches, slots and court configuration.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tournament ID type
pub type TournamentId = i64;

/// Match ID type
pub type MatchId = i64;

/// Registration ID type
pub type RegistrationId = i64;

/// Tournament lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Being configured, not visible to players
    Draft,
    /// Accepting registrations
    RegistrationOpen,
    /// Registrations frozen, draw not generated yet
    RegistrationClosed,
    /// Draw generated, matches exist
    DrawPublished,
    /// At least one match has been scheduled
    InProgress,
    /// Final rankings written
    Completed,
    /// Abandoned before completion
    Canceled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::RegistrationOpen => "registration_open",
            TournamentStatus::RegistrationClosed => "registration_closed",
            TournamentStatus::DrawPublished => "draw_published",
            TournamentStatus::InProgress => "in_progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Canceled => "canceled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(TournamentStatus::Draft),
            "registration_open" => Some(TournamentStatus::RegistrationOpen),
            "registration_closed" => Some(TournamentStatus::RegistrationClosed),
            "draw_published" => Some(TournamentStatus::DrawPublished),
            "in_progress" => Some(TournamentStatus::InProgress),
            "completed" => Some(TournamentStatus::Completed),
            "canceled" => Some(TournamentStatus::Canceled),
            _ => None,
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Competition format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Single-elimination bracket
    Elimination,
    /// Round-robin pools, then a knockout bracket of the qualifiers
    PoolsThenElimination,
    /// Round-robin pools only
    RoundRobin,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentFormat::Elimination => "elimination",
            TournamentFormat::PoolsThenElimination => "pools_then_elimination",
            TournamentFormat::RoundRobin => "round_robin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "elimination" => Some(TournamentFormat::Elimination),
            "pools_then_elimination" => Some(TournamentFormat::PoolsThenElimination),
            "round_robin" => Some(TournamentFormat::RoundRobin),
            _ => None,
        }
    }
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which part of the competition a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Pool,
    Elimination,
}

impl MatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPhase::Pool => "pool",
            MatchPhase::Elimination => "elimination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pool" => Some(MatchPhase::Pool),
            "elimination" => Some(MatchPhase::Elimination),
            _ => None,
        }
    }
}

/// Round label of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundType {
    Pool,
    /// Bracket round with the given number of entrants (16, 32, ...)
    RoundOf(u32),
    QuarterFinal,
    SemiFinal,
    Final,
    ThirdPlace,
}

impl RoundType {
    /// Label for a bracket round that starts with `entrants` players
    pub fn for_bracket_round(entrants: u32) -> Self {
        match entrants {
            0..=2 => RoundType::Final,
            3..=4 => RoundType::SemiFinal,
            5..=8 => RoundType::QuarterFinal,
            n => RoundType::RoundOf(n),
        }
    }

    pub fn label(&self) -> String {
        match self {
            RoundType::Pool => "pool".to_string(),
            RoundType::RoundOf(n) => format!("round_of_{n}"),
            RoundType::QuarterFinal => "quarterfinal".to_string(),
            RoundType::SemiFinal => "semifinal".to_string(),
            RoundType::Final => "final".to_string(),
            RoundType::ThirdPlace => "third_place".to_string(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pool" => Some(RoundType::Pool),
            "quarterfinal" => Some(RoundType::QuarterFinal),
            "semifinal" => Some(RoundType::SemiFinal),
            "final" => Some(RoundType::Final),
            "third_place" => Some(RoundType::ThirdPlace),
            other => other
                .strip_prefix("round_of_")
                .and_then(|n| n.parse().ok())
                .map(RoundType::RoundOf),
        }
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Match status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Not scheduled yet (slots may still be pending)
    Unresolved,
    Scheduled,
    InProgress,
    Completed,
    Walkover,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Unresolved => "unresolved",
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Walkover => "walkover",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unresolved" => Some(MatchStatus::Unresolved),
            "scheduled" => Some(MatchStatus::Scheduled),
            "in_progress" => Some(MatchStatus::InProgress),
            "completed" => Some(MatchStatus::Completed),
            "walkover" => Some(MatchStatus::Walkover),
            _ => None,
        }
    }

    /// Whether the match has a winner
    pub fn is_concluded(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Walkover)
    }
}

/// Which predecessor outcome feeds a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Winner,
    Loser,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Winner => "winner",
            Outcome::Loser => "loser",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "winner" => Some(Outcome::Winner),
            "loser" => Some(Outcome::Loser),
            _ => None,
        }
    }
}

/// One of the two team positions of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn index(&self) -> usize {
        match self {
            Side::Home => 0,
            Side::Away => 1,
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "home" => Some(Side::Home),
            "away" => Some(Side::Away),
            _ => None,
        }
    }
}

/// Reference to the outcome of an earlier match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotSource {
    pub match_id: MatchId,
    pub outcome: Outcome,
}

/// Current value of a slot: a concrete entrant, or the match it is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Entrant(RegistrationId),
    Awaiting(SlotSource),
}

impl Slot {
    pub fn entrant(&self) -> Option<RegistrationId> {
        match self {
            Slot::Entrant(id) => Some(*id),
            Slot::Awaiting(_) => None,
        }
    }
}

/// Most games one side can report for a single match
pub const MAX_GAMES_PER_SIDE: u32 = 999;

/// Games (or sets) won by each side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Games won by `side`
    pub fn for_side(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }
}

/// Result reported for a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Played { winner: Side, score: Option<Score> },
    Walkover { winner: Side },
}

impl MatchResult {
    pub fn winner(&self) -> Side {
        match self {
            MatchResult::Played { winner, .. } | MatchResult::Walkover { winner } => *winner,
        }
    }

    pub fn score(&self) -> Option<Score> {
        match self {
            MatchResult::Played { score, .. } => *score,
            MatchResult::Walkover { .. } => None,
        }
    }

    /// Check that a reported score agrees with the declared winner.
    pub fn validate(&self) -> Result<(), String> {
        let Some(score) = self.score() else {
            return Ok(());
        };
        if score.home > MAX_GAMES_PER_SIDE || score.away > MAX_GAMES_PER_SIDE {
            return Err(format!(
                "{}-{} exceeds {} games per side",
                score.home, score.away, MAX_GAMES_PER_SIDE
            ));
        }
        let winner = self.winner();
        if score.for_side(winner) <= score.for_side(winner.other()) {
            return Err(format!(
                "{}-{} does not give the {} side the win",
                score.home,
                score.away,
                winner.as_str()
            ));
        }
        Ok(())
    }

    pub fn status(&self) -> MatchStatus {
        match self {
            MatchResult::Played { .. } => MatchStatus::Completed,
            MatchResult::Walkover { .. } => MatchStatus::Walkover,
        }
    }
}

/// A match as persisted in the `matches` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub phase: MatchPhase,
    pub round_type: RoundType,
    pub round_number: u32,
    pub match_order: u32,
    pub pool_id: Option<u32>,
    /// Current slot values, home then away
    pub slots: [Slot; 2],
    /// Predecessor references as drawn; kept after the slot is filled
    pub feeders: [Option<SlotSource>; 2],
    pub status: MatchStatus,
    pub winner: Option<RegistrationId>,
    pub score: Option<Score>,
    pub scheduled_time: Option<NaiveDateTime>,
    pub court: Option<u32>,
}

impl Match {
    pub fn slot(&self, side: Side) -> Slot {
        self.slots[side.index()]
    }

    pub fn entrant(&self, side: Side) -> Option<RegistrationId> {
        self.slot(side).entrant()
    }

    /// Both entrants, once both slots are concrete
    pub fn entrants(&self) -> Option<(RegistrationId, RegistrationId)> {
        Some((self.entrant(Side::Home)?, self.entrant(Side::Away)?))
    }

    pub fn is_resolved(&self) -> bool {
        self.entrants().is_some()
    }

    pub fn involves(&self, registration_id: RegistrationId) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.entrant() == Some(registration_id))
    }

    pub fn side_of(&self, registration_id: RegistrationId) -> Option<Side> {
        [Side::Home, Side::Away]
            .into_iter()
            .find(|side| self.entrant(*side) == Some(registration_id))
    }

    /// Registration that lost a concluded match
    pub fn loser(&self) -> Option<RegistrationId> {
        let winner = self.winner?;
        let (home, away) = self.entrants()?;
        Some(if winner == home { away } else { home })
    }

    /// Whether a match is waiting for a court and time
    pub fn needs_scheduling(&self) -> bool {
        self.scheduled_time.is_none() && !self.status.is_concluded()
    }
}

/// Court capacity and daily playing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtConfig {
    pub available_courts: u32,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub match_duration_minutes: u32,
}

impl CourtConfig {
    pub fn new(
        available_courts: u32,
        open_time: NaiveTime,
        close_time: NaiveTime,
        match_duration_minutes: u32,
    ) -> Self {
        Self {
            available_courts,
            open_time,
            close_time,
            match_duration_minutes,
        }
    }

    pub fn match_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.match_duration_minutes))
    }

    /// Whether one match fits into the daily window
    pub fn window_fits_match(&self) -> bool {
        self.match_duration_minutes > 0
            && self.open_time < self.close_time
            && self.close_time - self.open_time >= self.match_duration()
    }
}

impl Default for CourtConfig {
    /// Two courts, 08:00 to 20:00, 90-minute matches
    fn default() -> Self {
        Self {
            available_courts: 2,
            open_time: NaiveTime::from_hms_opt(8, 0, 0).expect("08:00 is a valid time"),
            close_time: NaiveTime::from_hms_opt(20, 0, 0).expect("20:00 is a valid time"),
            match_duration_minutes: 90,
        }
    }
}

/// Configuration supplied when a tournament is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    pub format: TournamentFormat,
    pub start_date: NaiveDate,
    /// Nominal last day; overrunning it is reported, not rejected
    pub end_date: Option<NaiveDate>,
    pub courts: CourtConfig,
    /// Fewest registrations a draw can be generated from
    pub min_registrations: u32,
}

impl TournamentConfig {
    pub fn new(name: impl Into<String>, format: TournamentFormat, start_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            format,
            start_date,
            end_date: None,
            courts: CourtConfig::default(),
            min_registrations: 2,
        }
    }

    pub fn with_courts(mut self, courts: CourtConfig) -> Self {
        self.courts = courts;
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_min_registrations(mut self, min_registrations: u32) -> Self {
        self.min_registrations = min_registrations;
        self
    }
}

/// Draw parameters persisted with the tournament, needed again when the
/// pool phase hands over to the knockout phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawSettings {
    pub pool_size: Option<u32>,
    pub advance_per_pool: u32,
    pub third_place_match: bool,
}

/// Default pool size for `pools_then_elimination`
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Default qualifiers per pool for `pools_then_elimination`
pub const DEFAULT_ADVANCE_PER_POOL: u32 = 2;

/// Caller options for draw generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawOptions {
    /// Discard existing matches and draw again
    pub force_regenerate: bool,
    /// Target pool size; defaults depend on the format
    pub pool_size: Option<u32>,
    /// Qualifiers per pool for `pools_then_elimination`
    pub advance_per_pool: Option<u32>,
    pub third_place_match: bool,
    /// Seed for placing unseeded entrants reproducibly
    pub rng_seed: Option<u64>,
}

impl DrawOptions {
    pub fn settings(&self) -> DrawSettings {
        DrawSettings {
            pool_size: self.pool_size,
            advance_per_pool: self.advance_per_pool.unwrap_or(DEFAULT_ADVANCE_PER_POOL),
            third_place_match: self.third_place_match,
        }
    }
}

/// Tournament information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentInfo {
    pub id: TournamentId,
    pub name: String,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub courts: CourtConfig,
    pub min_registrations: u32,
    /// Written by the draw
    pub draw_settings: Option<DrawSettings>,
    /// Bumped by every scheduling pass
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Competing entry: one player, or a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub tournament_id: TournamentId,
    pub player_one: String,
    pub player_two: Option<String>,
    pub seed_number: Option<u32>,
    /// Pool assigned by the draw
    pub pool_id: Option<u32>,
    pub final_ranking: Option<u32>,
    pub withdrawn: bool,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn display_name(&self) -> String {
        match &self.player_two {
            Some(partner) => format!("{} / {}", self.player_one, partner),
            None => self.player_one.clone(),
        }
    }
}

/// Sign-up payload from the registration form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegistration {
    pub player_one: String,
    pub player_two: Option<String>,
    pub seed_number: Option<u32>,
}

impl NewRegistration {
    pub fn single(player: impl Into<String>) -> Self {
        Self {
            player_one: player.into(),
            player_two: None,
            seed_number: None,
        }
    }

    pub fn pair(player_one: impl Into<String>, player_two: impl Into<String>) -> Self {
        Self {
            player_one: player_one.into(),
            player_two: Some(player_two.into()),
            seed_number: None,
        }
    }

    pub fn seeded(mut self, seed_number: u32) -> Self {
        self.seed_number = Some(seed_number);
        self
    }
}

/// Shape of a generated draw
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BracketShape {
    Elimination {
        bracket_size: u32,
        rounds: u32,
        byes: u32,
    },
    Pools {
        pool_sizes: Vec<u32>,
        rounds: u32,
        /// Qualifiers per pool when a knockout follows
        advance_per_pool: Option<u32>,
    },
}

/// Returned by `generate_draw`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawSummary {
    pub matches_created: usize,
    pub bracket_shape: BracketShape,
}

/// Returned by `schedule_matches`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub matches_scheduled: usize,
    /// Earliest start written by this pass
    pub start_date: Option<NaiveDateTime>,
    /// Distinct courts used by this pass
    pub courts_used: usize,
    /// Latest end written by this pass
    pub ends_at: Option<NaiveDateTime>,
    pub overruns_end_date: bool,
}

/// Returned by `record_result`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Winner was written into a downstream slot
    pub advanced: bool,
    /// Matches whose slots both became concrete
    pub ready_matches: Vec<MatchId>,
    /// Matches settled as walkovers because an entrant had withdrawn
    pub walkovers: Vec<MatchId>,
    /// Knockout matches created because the pool phase finished
    pub knockout_matches_created: usize,
}

/// Returned by `finalize_rankings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingSummary {
    pub rankings_written: usize,
}

/// Returned by `withdraw_registration`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalSummary {
    pub walkovers: Vec<MatchId>,
    pub advanced: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_type_labels_round_trip() {
        for round in [
            RoundType::Pool,
            RoundType::RoundOf(32),
            RoundType::QuarterFinal,
            RoundType::SemiFinal,
            RoundType::Final,
            RoundType::ThirdPlace,
        ] {
            assert_eq!(RoundType::parse(&round.label()), Some(round));
        }
        assert_eq!(RoundType::parse("round_of_x"), None);
    }

    #[test]
    fn test_round_type_for_bracket_round() {
        assert_eq!(RoundType::for_bracket_round(2), RoundType::Final);
        assert_eq!(RoundType::for_bracket_round(4), RoundType::SemiFinal);
        assert_eq!(RoundType::for_bracket_round(8), RoundType::QuarterFinal);
        assert_eq!(RoundType::for_bracket_round(16), RoundType::RoundOf(16));
    }

    #[test]
    fn test_default_court_window_fits() {
        let courts = CourtConfig::default();
        assert!(courts.window_fits_match());
        assert_eq!(courts.match_duration(), Duration::minutes(90));

        let too_long = CourtConfig {
            match_duration_minutes: 13 * 60,
            ..courts
        };
        assert!(!too_long.window_fits_match());
    }

    #[test]
    fn test_match_loser() {
        let m = Match {
            id: 1,
            tournament_id: 1,
            phase: MatchPhase::Elimination,
            round_type: RoundType::Final,
            round_number: 1,
            match_order: 1,
            pool_id: None,
            slots: [Slot::Entrant(10), Slot::Entrant(20)],
            feeders: [None, None],
            status: MatchStatus::Completed,
            winner: Some(20),
            score: None,
            scheduled_time: None,
            court: None,
        };
        assert_eq!(m.loser(), Some(10));
        assert_eq!(m.side_of(20), Some(Side::Away));
        assert!(m.involves(10));
        assert!(!m.needs_scheduling());
    }

    #[test]
    fn test_draw_options_defaults() {
        let settings = DrawOptions::default().settings();
        assert_eq!(settings.advance_per_pool, DEFAULT_ADVANCE_PER_POOL);
        assert_eq!(settings.pool_size, None);
        assert!(!settings.third_place_match);
    }

    #[test]
    fn test_score_must_favour_the_winner() {
        let played = |winner, home, away| MatchResult::Played {
            winner,
            score: Some(Score::new(home, away)),
        };
        assert!(played(Side::Home, 6, 3).validate().is_ok());
        assert!(played(Side::Away, 2, 6).validate().is_ok());
        assert!(played(Side::Home, 0, 6).validate().is_err());
        assert!(played(Side::Away, 4, 4).validate().is_err());
        assert!(played(Side::Home, u32::MAX, 0).validate().is_err());
        assert!(MatchResult::Played { winner: Side::Home, score: None }.validate().is_ok());
        assert!(MatchResult::Walkover { winner: Side::Away }.validate().is_ok());
    }
}
