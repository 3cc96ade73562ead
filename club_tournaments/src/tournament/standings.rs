//! Pool standings.
//!
//! Order inside a pool: wins, then head-to-head wins among the tied group,
//! then game differential, then games won, then draw seed.

use super::models::{Match, MatchPhase, Registration, RegistrationId, Side};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One entrant's line in a pool table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub registration_id: RegistrationId,
    pub pool_id: u32,
    /// 1-based position within the pool
    pub position: u32,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    pub games_for: u32,
    pub games_against: u32,
    /// Draw seed, used as the last tie-break
    pub seed: u32,
}

impl StandingRow {
    fn new(registration_id: RegistrationId, pool_id: u32, seed: u32) -> Self {
        Self {
            registration_id,
            pool_id,
            position: 0,
            played: 0,
            wins: 0,
            losses: 0,
            games_for: 0,
            games_against: 0,
            seed,
        }
    }

    pub fn differential(&self) -> i64 {
        i64::from(self.games_for) - i64::from(self.games_against)
    }
}

/// Standings for one pool. `members` lists everyone drawn into the pool,
/// including entrants that have no match (a pool of one).
pub fn pool_standings(
    pool_id: u32,
    members: &[RegistrationId],
    matches: &[Match],
    seeds: &HashMap<RegistrationId, u32>,
) -> Vec<StandingRow> {
    let pool_matches: Vec<&Match> = matches
        .iter()
        .filter(|m| m.phase == MatchPhase::Pool && m.pool_id == Some(pool_id))
        .filter(|m| m.status.is_concluded())
        .collect();

    let mut rows: HashMap<RegistrationId, StandingRow> = members
        .iter()
        .map(|&id| {
            let seed = seeds.get(&id).copied().unwrap_or(u32::MAX);
            (id, StandingRow::new(id, pool_id, seed))
        })
        .collect();

    for m in &pool_matches {
        let (Some(winner), Some((home, away))) = (m.winner, m.entrants()) else {
            continue;
        };
        for (side, id) in [(Side::Home, home), (Side::Away, away)] {
            let Some(row) = rows.get_mut(&id) else {
                continue;
            };
            row.played += 1;
            if id == winner {
                row.wins += 1;
            } else {
                row.losses += 1;
            }
            if let Some(score) = m.score {
                row.games_for = row.games_for.saturating_add(score.for_side(side));
                row.games_against = row.games_against.saturating_add(score.for_side(side.other()));
            }
        }
    }

    let mut ordered: Vec<StandingRow> = rows.into_values().collect();
    ordered.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.registration_id.cmp(&b.registration_id)));

    // Break ties group by group.
    let mut result = Vec::with_capacity(ordered.len());
    let mut start = 0;
    while start < ordered.len() {
        let wins = ordered[start].wins;
        let end = ordered[start..]
            .iter()
            .position(|row| row.wins != wins)
            .map_or(ordered.len(), |offset| start + offset);
        let mut group = ordered[start..end].to_vec();
        if group.len() > 1 {
            let members: HashSet<RegistrationId> = group.iter().map(|r| r.registration_id).collect();
            let h2h = head_to_head_wins(&pool_matches, &members);
            group.sort_by(|a, b| {
                let ha = h2h.get(&a.registration_id).copied().unwrap_or(0);
                let hb = h2h.get(&b.registration_id).copied().unwrap_or(0);
                hb.cmp(&ha)
                    .then(b.differential().cmp(&a.differential()))
                    .then(b.games_for.cmp(&a.games_for))
                    .then(a.seed.cmp(&b.seed))
                    .then(a.registration_id.cmp(&b.registration_id))
            });
        }
        result.extend(group);
        start = end;
    }

    for (idx, row) in result.iter_mut().enumerate() {
        row.position = idx as u32 + 1;
    }
    result
}

fn head_to_head_wins(
    matches: &[&Match],
    group: &HashSet<RegistrationId>,
) -> HashMap<RegistrationId, u32> {
    let mut wins = HashMap::new();
    for m in matches {
        let (Some(winner), Some((home, away))) = (m.winner, m.entrants()) else {
            continue;
        };
        if group.contains(&home) && group.contains(&away) {
            *wins.entry(winner).or_insert(0) += 1;
        }
    }
    wins
}

/// Standings of every pool, keyed by pool id
pub fn all_pool_standings(
    registrations: &[Registration],
    matches: &[Match],
) -> BTreeMap<u32, Vec<StandingRow>> {
    let seeds: HashMap<RegistrationId, u32> = registrations
        .iter()
        .filter_map(|r| Some((r.id, r.seed_number?)))
        .collect();

    let mut members: BTreeMap<u32, Vec<RegistrationId>> = BTreeMap::new();
    for registration in registrations {
        if let Some(pool_id) = registration.pool_id {
            members.entry(pool_id).or_default().push(registration.id);
        }
    }

    members
        .into_iter()
        .map(|(pool_id, ids)| (pool_id, pool_standings(pool_id, &ids, matches, &seeds)))
        .collect()
}

/// Order rows from different pools: pool position first, then record.
pub fn rank_across_pools<'a>(rows: impl IntoIterator<Item = &'a StandingRow>) -> Vec<StandingRow> {
    let mut rows: Vec<StandingRow> = rows.into_iter().cloned().collect();
    rows.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then(b.wins.cmp(&a.wins))
            .then(b.differential().cmp(&a.differential()))
            .then(b.games_for.cmp(&a.games_for))
            .then(a.seed.cmp(&b.seed))
            .then(a.registration_id.cmp(&b.registration_id))
    });
    rows
}

/// Entrants advancing to the knockout, best first: all pool winners, then
/// all runners-up, and so on.
pub fn qualifiers(
    standings: &BTreeMap<u32, Vec<StandingRow>>,
    advance_per_pool: u32,
) -> Vec<RegistrationId> {
    rank_across_pools(
        standings
            .values()
            .flatten()
            .filter(|row| row.position <= advance_per_pool),
    )
    .into_iter()
    .map(|row| row.registration_id)
    .collect()
}
