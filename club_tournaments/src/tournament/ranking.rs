//! Final placement once every match of the structure has concluded.

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    DrawSettings, Match, MatchPhase, Registration, RegistrationId, RoundType, TournamentFormat,
};
use super::standings::{all_pool_standings, qualifiers, rank_across_pools};
use std::collections::{HashMap, HashSet};

/// Entrants ranked by bracket exit, champion first.
///
/// An entrant's exit level is twice the round in which they lost; the
/// champion sits above the final's loser and a third-place win lifts its
/// winner one step above the other semifinal loser. Equal levels are
/// ordered by `seed_order`.
pub fn elimination_order(
    matches: &[Match],
    seed_order: &[RegistrationId],
) -> TournamentResult<Vec<RegistrationId>> {
    let bracket: Vec<&Match> = matches
        .iter()
        .filter(|m| m.phase == MatchPhase::Elimination)
        .collect();

    let open = bracket.iter().filter(|m| !m.status.is_concluded()).count();
    if open > 0 {
        return Err(TournamentError::StructureIncomplete { remaining: open });
    }

    let mut level: HashMap<RegistrationId, u32> = HashMap::new();
    for m in &bracket {
        let (home, away) = m.entrants().ok_or_else(|| {
            TournamentError::Inconsistency(format!("match {} concluded with an empty slot", m.id))
        })?;
        level.entry(home).or_insert(0);
        level.entry(away).or_insert(0);
    }

    for m in bracket.iter().filter(|m| m.round_type != RoundType::ThirdPlace) {
        let loser = m
            .loser()
            .ok_or_else(|| TournamentError::Inconsistency(format!("match {} has no winner", m.id)))?;
        level.insert(loser, m.round_number * 2);
        if m.round_type == RoundType::Final {
            if let Some(winner) = m.winner {
                level.insert(winner, m.round_number * 2 + 2);
            }
        }
    }

    for m in bracket.iter().filter(|m| m.round_type == RoundType::ThirdPlace) {
        if let Some(winner) = m.winner {
            if let Some(entry) = level.get_mut(&winner) {
                *entry += 1;
            }
        }
    }

    let seed_index: HashMap<RegistrationId, usize> = seed_order
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, idx))
        .collect();

    let mut order: Vec<RegistrationId> = level.keys().copied().collect();
    order.sort_by(|a, b| {
        level[b]
            .cmp(&level[a])
            .then(
                seed_index
                    .get(a)
                    .copied()
                    .unwrap_or(usize::MAX)
                    .cmp(&seed_index.get(b).copied().unwrap_or(usize::MAX)),
            )
            .then(a.cmp(b))
    });
    Ok(order)
}

/// Final ranking `(registration, rank)` for every drawn registration.
///
/// Registrations withdrawn before the draw carry no seed and are left
/// unranked.
pub fn final_rankings(
    format: TournamentFormat,
    settings: Option<&DrawSettings>,
    registrations: &[Registration],
    matches: &[Match],
) -> TournamentResult<Vec<(RegistrationId, u32)>> {
    let remaining = matches.iter().filter(|m| !m.status.is_concluded()).count();
    if remaining > 0 {
        return Err(TournamentError::StructureIncomplete { remaining });
    }

    let mut drawn: Vec<&Registration> = registrations
        .iter()
        .filter(|r| r.seed_number.is_some())
        .collect();
    drawn.sort_by_key(|r| (r.seed_number, r.id));
    let seed_order: Vec<RegistrationId> = drawn.iter().map(|r| r.id).collect();

    let order = match format {
        TournamentFormat::Elimination => elimination_order(matches, &seed_order)?,
        TournamentFormat::RoundRobin => {
            let standings = all_pool_standings(registrations, matches);
            rank_across_pools(standings.values().flatten())
                .into_iter()
                .map(|row| row.registration_id)
                .collect()
        }
        TournamentFormat::PoolsThenElimination => {
            let standings = all_pool_standings(registrations, matches);
            let advance = settings.map_or(0, |s| s.advance_per_pool);
            let qualified = qualifiers(&standings, advance);
            let has_knockout = matches.iter().any(|m| m.phase == MatchPhase::Elimination);

            let mut order = if has_knockout {
                elimination_order(matches, &qualified)?
            } else if qualified.len() < 2 {
                // Too few qualifiers for a bracket: the pools decide.
                Vec::new()
            } else {
                return Err(TournamentError::Inconsistency(
                    "pool phase finished but no knockout bracket exists".to_string(),
                ));
            };

            let placed: HashSet<RegistrationId> = order.iter().copied().collect();
            order.extend(
                rank_across_pools(standings.values().flatten())
                    .into_iter()
                    .map(|row| row.registration_id)
                    .filter(|id| !placed.contains(id)),
            );
            order
        }
    };

    let expected: HashSet<RegistrationId> = seed_order.iter().copied().collect();
    let ranked: HashSet<RegistrationId> = order.iter().copied().collect();
    if ranked != expected || order.len() != expected.len() {
        return Err(TournamentError::Inconsistency(format!(
            "ranking covers {} entrant(s), draw has {}",
            order.len(),
            expected.len()
        )));
    }

    Ok(order
        .into_iter()
        .enumerate()
        .map(|(idx, id)| (id, idx as u32 + 1))
        .collect())
}
