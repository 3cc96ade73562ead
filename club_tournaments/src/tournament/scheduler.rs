//! Greedy court and time assignment.
//!
//! Matches are taken in `(round_number, match_order)` order. Each goes to
//! the court that can start it earliest, no earlier than its entrants' and
//! feeder matches' end times. Ties go to the lowest court index. A match
//! that would run past closing time moves to the next day's opening.
//!
//! Matches that already carry a time are never moved; they only push the
//! court and entrant horizons forward.

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    CourtConfig, Match, MatchId, MatchStatus, RegistrationId, ScheduleSummary, TournamentId,
};
use chrono::{Days, Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};

/// A court and start time for one match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourtAssignment {
    pub match_id: MatchId,
    pub scheduled_time: NaiveDateTime,
    pub court: u32,
}

/// Output of one scheduling pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulePlan {
    pub assignments: Vec<CourtAssignment>,
    /// Unscheduled matches left alone because a slot is still pending
    pub waiting: usize,
}

impl SchedulePlan {
    pub fn summary(&self, duration: Duration, end_date: Option<NaiveDate>) -> ScheduleSummary {
        let start_date = self.assignments.iter().map(|a| a.scheduled_time).min();
        let ends_at = self
            .assignments
            .iter()
            .map(|a| a.scheduled_time + duration)
            .max();
        let courts_used = self
            .assignments
            .iter()
            .map(|a| a.court)
            .collect::<BTreeSet<_>>()
            .len();

        ScheduleSummary {
            matches_scheduled: self.assignments.len(),
            start_date,
            courts_used,
            ends_at,
            overruns_end_date: match (ends_at, end_date) {
                (Some(ends), Some(last_day)) => ends.date() > last_day,
                _ => false,
            },
        }
    }

    /// Write the assignments into an in-memory match list
    pub fn apply_to(&self, matches: &mut [Match]) {
        let by_id: HashMap<MatchId, &CourtAssignment> =
            self.assignments.iter().map(|a| (a.match_id, a)).collect();
        for m in matches.iter_mut() {
            if let Some(assignment) = by_id.get(&m.id) {
                m.scheduled_time = Some(assignment.scheduled_time);
                m.court = Some(assignment.court);
                m.status = MatchStatus::Scheduled;
            }
        }
    }
}

/// Greedy placement state. `court_free` holds one entry per court and is
/// never empty.
struct CourtScheduler {
    tournament_id: TournamentId,
    courts: CourtConfig,
    duration: Duration,
    opening: NaiveDateTime,
    court_free: Vec<NaiveDateTime>,
    entrant_free: HashMap<RegistrationId, NaiveDateTime>,
    match_end: HashMap<MatchId, NaiveDateTime>,
}

impl CourtScheduler {
    fn new(
        tournament_id: TournamentId,
        courts: CourtConfig,
        start_date: NaiveDate,
    ) -> TournamentResult<Self> {
        if courts.available_courts == 0 {
            return Err(TournamentError::NoCourtsConfigured(tournament_id));
        }
        let opening = start_date.and_time(courts.open_time);
        Ok(Self {
            tournament_id,
            courts,
            duration: courts.match_duration(),
            opening,
            court_free: vec![opening; courts.available_courts as usize],
            entrant_free: HashMap::new(),
            match_end: HashMap::new(),
        })
    }

    fn occupy(&mut self, m: &Match, start: NaiveDateTime, court: u32) {
        let end = start + self.duration;
        if let Some(free) = self.court_free.get_mut(court as usize) {
            *free = (*free).max(end);
        }
        for entrant in m.slots.iter().filter_map(|s| s.entrant()) {
            let free = self.entrant_free.entry(entrant).or_insert(end);
            *free = (*free).max(end);
        }
        self.match_end.insert(m.id, end);
    }

    fn earliest_allowed(&self, m: &Match) -> NaiveDateTime {
        let feeders = m
            .feeders
            .iter()
            .flatten()
            .filter_map(|source| self.match_end.get(&source.match_id));
        let entrants = m
            .slots
            .iter()
            .filter_map(|s| s.entrant())
            .filter_map(|id| self.entrant_free.get(&id));

        feeders
            .chain(entrants)
            .copied()
            .fold(self.opening, NaiveDateTime::max)
    }

    /// Move `at` into the playing window so the whole match fits
    fn fit_window(&self, at: NaiveDateTime) -> NaiveDateTime {
        let day = at.date();
        let open = day.and_time(self.courts.open_time);
        let close = day.and_time(self.courts.close_time);
        if at < open {
            open
        } else if at + self.duration > close {
            (day + Days::new(1)).and_time(self.courts.open_time)
        } else {
            at
        }
    }

    fn place(&mut self, m: &Match) -> TournamentResult<CourtAssignment> {
        let earliest = self.earliest_allowed(m);
        let (court, start) = self
            .court_free
            .iter()
            .enumerate()
            .map(|(court, free)| (court as u32, self.fit_window((*free).max(earliest))))
            // min_by_key keeps the first of equal starts: the lowest court.
            .min_by_key(|(_, start)| *start)
            .ok_or(TournamentError::NoCourtsConfigured(self.tournament_id))?;

        self.occupy(m, start, court);
        Ok(CourtAssignment {
            match_id: m.id,
            scheduled_time: start,
            court,
        })
    }
}

/// Plan start times and courts for every unscheduled, fully-resolved match.
///
/// # Errors
///
/// * `TournamentError::NoCourtsConfigured` - `available_courts` is zero
/// * `TournamentError::InvalidConfig` - the daily window cannot hold a match
pub fn plan_schedule(
    tournament_id: TournamentId,
    courts: CourtConfig,
    start_date: NaiveDate,
    matches: &[Match],
) -> TournamentResult<SchedulePlan> {
    let mut scheduler = CourtScheduler::new(tournament_id, courts, start_date)?;
    if !courts.window_fits_match() {
        return Err(TournamentError::InvalidConfig(format!(
            "a {}-minute match does not fit between {} and {}",
            courts.match_duration_minutes, courts.open_time, courts.close_time
        )));
    }

    for m in matches {
        if let (Some(start), Some(court)) = (m.scheduled_time, m.court) {
            scheduler.occupy(m, start, court);
        }
    }

    let mut pending: Vec<&Match> = matches.iter().filter(|m| m.needs_scheduling()).collect();
    pending.sort_by_key(|m| (m.round_number, m.match_order, m.id));

    let mut plan = SchedulePlan::default();
    for m in pending {
        if m.is_resolved() {
            plan.assignments.push(scheduler.place(m)?);
        } else {
            plan.waiting += 1;
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::draw::{PlannedSlot, elimination_plan};
    use crate::tournament::models::{Outcome, RoundType, Side, Slot, SlotSource};
    use chrono::NaiveTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn courts(count: u32, open: u32, close: u32, minutes: u32) -> CourtConfig {
        CourtConfig::new(
            count,
            NaiveTime::from_hms_opt(open, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(close, 0, 0).unwrap(),
            minutes,
        )
    }

    /// Turn a draw plan into matches with ids `1..`
    fn materialize(n: i64) -> Vec<Match> {
        let ranked: Vec<i64> = (1..=n).collect();
        let plan = elimination_plan(&ranked, 1, false);
        plan.matches
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                let mut slots = [Slot::Entrant(0); 2];
                let mut feeders = [None; 2];
                for (i, s) in p.slots.iter().enumerate() {
                    match s {
                        PlannedSlot::Entrant(id) => slots[i] = Slot::Entrant(*id),
                        PlannedSlot::WinnerOf(j) | PlannedSlot::LoserOf(j) => {
                            let outcome = if matches!(s, PlannedSlot::WinnerOf(_)) {
                                Outcome::Winner
                            } else {
                                Outcome::Loser
                            };
                            let source = SlotSource {
                                match_id: *j as i64 + 1,
                                outcome,
                            };
                            slots[i] = Slot::Awaiting(source);
                            feeders[i] = Some(source);
                        }
                    }
                }
                Match {
                    id: idx as i64 + 1,
                    tournament_id: 1,
                    phase: p.phase,
                    round_type: p.round_type,
                    round_number: p.round_number,
                    match_order: p.match_order,
                    pool_id: p.pool_id,
                    slots,
                    feeders,
                    status: MatchStatus::Unresolved,
                    winner: None,
                    score: None,
                    scheduled_time: None,
                    court: None,
                }
            })
            .collect()
    }

    /// Home side wins every scheduled match; fill downstream slots
    fn complete_scheduled(matches: &mut [Match]) {
        let done: Vec<(MatchId, i64)> = matches
            .iter_mut()
            .filter(|m| m.status == MatchStatus::Scheduled)
            .map(|m| {
                m.status = MatchStatus::Completed;
                let winner = m.entrant(Side::Home).unwrap();
                m.winner = Some(winner);
                (m.id, winner)
            })
            .collect();
        for (id, winner) in done {
            for m in matches.iter_mut() {
                for slot in m.slots.iter_mut() {
                    if *slot == Slot::Awaiting(SlotSource { match_id: id, outcome: Outcome::Winner }) {
                        *slot = Slot::Entrant(winner);
                    }
                }
            }
        }
    }

    #[test]
    fn test_eight_entrants_two_courts_scenario() {
        let config = courts(2, 8, 20, 90);
        let mut matches = materialize(8);
        assert_eq!(matches.len(), 7);

        let first = plan_schedule(1, config, date(), &matches).unwrap();
        assert_eq!(first.assignments.len(), 4);
        assert_eq!(first.waiting, 3);
        let starts: Vec<_> = first.assignments.iter().map(|a| (a.scheduled_time, a.court)).collect();
        assert_eq!(
            starts,
            vec![(at(2, 8, 0), 0), (at(2, 8, 0), 1), (at(2, 9, 30), 0), (at(2, 9, 30), 1)]
        );
        first.apply_to(&mut matches);
        complete_scheduled(&mut matches);

        let semis = plan_schedule(1, config, date(), &matches).unwrap();
        assert_eq!(semis.assignments.len(), 2);
        for a in &semis.assignments {
            assert!(a.scheduled_time >= at(2, 11, 0));
        }
        semis.apply_to(&mut matches);
        let latest_semi_end = semis
            .assignments
            .iter()
            .map(|a| a.scheduled_time + Duration::minutes(90))
            .max()
            .unwrap();
        complete_scheduled(&mut matches);

        let final_plan = plan_schedule(1, config, date(), &matches).unwrap();
        assert_eq!(final_plan.assignments.len(), 1);
        assert!(final_plan.assignments[0].scheduled_time >= latest_semi_end);
        let final_match = matches.iter().find(|m| m.round_type == RoundType::Final).unwrap();
        assert_eq!(final_match.id, final_plan.assignments[0].match_id);
    }

    #[test]
    fn test_no_courts_configured() {
        let matches = materialize(4);
        let err = plan_schedule(9, courts(0, 8, 20, 60), date(), &matches).unwrap_err();
        assert!(matches!(err, TournamentError::NoCourtsConfigured(9)));
    }

    #[test]
    fn test_no_courts_wins_over_short_window() {
        let matches = materialize(4);
        let err = plan_schedule(3, courts(0, 8, 9, 90), date(), &matches).unwrap_err();
        assert!(matches!(err, TournamentError::NoCourtsConfigured(3)));
    }

    #[test]
    fn test_assignments_stay_within_configured_courts() {
        let matches = materialize(16);
        let plan = plan_schedule(1, courts(3, 8, 20, 60), date(), &matches).unwrap();
        assert_eq!(plan.assignments.len(), 8);
        assert!(plan.assignments.iter().all(|a| a.court < 3));
    }

    #[test]
    fn test_window_too_short_for_a_match() {
        let matches = materialize(4);
        let err = plan_schedule(1, courts(2, 8, 9, 90), date(), &matches).unwrap_err();
        assert!(matches!(err, TournamentError::InvalidConfig(_)));
    }

    #[test]
    fn test_rolls_to_next_day_when_window_is_full() {
        // 08:00-11:00 fits two 90-minute matches per court per day.
        let config = courts(1, 8, 11, 90);
        let matches = materialize(8);
        let plan = plan_schedule(1, config, date(), &matches).unwrap();
        let starts: Vec<_> = plan.assignments.iter().map(|a| a.scheduled_time).collect();
        assert_eq!(starts, vec![at(2, 8, 0), at(2, 9, 30), at(3, 8, 0), at(3, 9, 30)]);

        let summary = plan.summary(config.match_duration(), Some(date()));
        assert!(summary.overruns_end_date);
        assert_eq!(summary.courts_used, 1);
        assert_eq!(summary.ends_at, Some(at(3, 11, 0)));
    }

    #[test]
    fn test_rescheduling_never_moves_existing_assignments() {
        let config = courts(3, 8, 20, 60);
        let mut matches = materialize(16);
        let first = plan_schedule(1, config, date(), &matches).unwrap();
        first.apply_to(&mut matches);
        let before: Vec<_> = matches.iter().map(|m| (m.scheduled_time, m.court)).collect();

        let again = plan_schedule(1, config, date(), &matches).unwrap();
        assert!(again.assignments.is_empty());
        again.apply_to(&mut matches);
        let after: Vec<_> = matches.iter().map(|m| (m.scheduled_time, m.court)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_new_matches_start_after_existing_court_bookings() {
        let config = courts(2, 8, 20, 60);
        let mut matches = materialize(8);
        plan_schedule(1, config, date(), &matches)
            .unwrap()
            .apply_to(&mut matches);
        complete_scheduled(&mut matches);

        let semis = plan_schedule(1, config, date(), &matches).unwrap();
        let round_one_end = matches
            .iter()
            .filter(|m| m.round_number == 1)
            .map(|m| m.scheduled_time.unwrap() + Duration::minutes(60))
            .max()
            .unwrap();
        assert!(semis.assignments.iter().all(|a| a.scheduled_time >= round_one_end));
    }

    #[test]
    fn test_entrant_never_double_booked() {
        // Two matches for the same entrant: the second waits even though
        // a court is free.
        let mut a = materialize(2).remove(0);
        a.round_number = 1;
        let mut b = a.clone();
        b.id = 2;
        b.match_order = 2;
        b.slots = [Slot::Entrant(1), Slot::Entrant(3)];

        let plan = plan_schedule(1, courts(4, 8, 20, 45), date(), &[a, b]).unwrap();
        assert_eq!(plan.assignments[0].scheduled_time, at(2, 8, 0));
        assert_eq!(plan.assignments[1].scheduled_time, at(2, 8, 45));
        assert_eq!(plan.assignments[1].court, 0);
    }
}
