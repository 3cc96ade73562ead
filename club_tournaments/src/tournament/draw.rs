//! Draw generation: seeded elimination brackets and round-robin pools.
//!
//! Planning is pure. A [`DrawPlan`] refers to earlier matches by their index
//! in the plan; the store swaps indices for row ids as it inserts them in
//! order, so a predecessor is always written before the matches it feeds.

use super::models::{BracketShape, MatchPhase, Registration, RegistrationId, RoundType};
use rand::{Rng, seq::SliceRandom};

/// Slot of a planned match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedSlot {
    Entrant(RegistrationId),
    /// Winner of the plan entry at this index
    WinnerOf(usize),
    /// Loser of the plan entry at this index
    LoserOf(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMatch {
    pub phase: MatchPhase,
    pub round_type: RoundType,
    pub round_number: u32,
    pub match_order: u32,
    pub pool_id: Option<u32>,
    pub slots: [PlannedSlot; 2],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPlan {
    pub matches: Vec<PlannedMatch>,
    pub shape: BracketShape,
    /// Pool members, pool `i + 1` at index `i`; empty for a bracket
    pub pools: Vec<Vec<RegistrationId>>,
}

/// Order entrants for the draw: seeded ones by seed number, then the
/// unseeded ones in random order.
pub fn seeded_order<R: Rng + ?Sized>(
    registrations: &[Registration],
    rng: &mut R,
) -> Vec<RegistrationId> {
    let mut seeded: Vec<&Registration> = registrations
        .iter()
        .filter(|r| r.seed_number.is_some())
        .collect();
    seeded.sort_by_key(|r| (r.seed_number, r.id));

    let mut unseeded: Vec<RegistrationId> = registrations
        .iter()
        .filter(|r| r.seed_number.is_none())
        .map(|r| r.id)
        .collect();
    unseeded.sort_unstable();
    unseeded.shuffle(rng);

    seeded.into_iter().map(|r| r.id).chain(unseeded).collect()
}

/// Seed numbers (1-based) in bracket position order for a power-of-two
/// bracket. Adjacent pairs meet in round one, e.g. `[1, 8, 4, 5, 2, 7, 3, 6]`.
pub fn bracket_positions(size: u32) -> Vec<u32> {
    let mut positions = vec![1];
    let mut current = 1;
    while current < size {
        current *= 2;
        positions = positions
            .into_iter()
            .flat_map(|seed| [seed, current + 1 - seed])
            .collect();
    }
    positions
}

/// Single-elimination bracket for `ranked` (best seed first), with rounds
/// numbered from `first_round`.
///
/// Byes go to the top seeds and are resolved in the plan itself: the bye
/// holder is placed directly into its second-round slot, so the plan holds
/// exactly `ranked.len() - 1` matches (plus the optional third-place match).
pub fn elimination_plan(ranked: &[RegistrationId], first_round: u32, third_place: bool) -> DrawPlan {
    let entrants = ranked.len() as u32;
    let size = entrants.max(2).next_power_of_two();
    let rounds = size.trailing_zeros();
    let mut matches: Vec<PlannedMatch> = Vec::new();

    let entrant_for = |seed: u32| -> Option<RegistrationId> {
        ranked.get(seed as usize - 1).copied()
    };

    let positions = bracket_positions(size);
    let mut entries: Vec<PlannedSlot> = Vec::with_capacity(positions.len() / 2);
    let mut order = 0;
    for pair in positions.chunks(2) {
        match (entrant_for(pair[0]), entrant_for(pair[1])) {
            (Some(home), Some(away)) => {
                order += 1;
                matches.push(PlannedMatch {
                    phase: MatchPhase::Elimination,
                    round_type: RoundType::for_bracket_round(size),
                    round_number: first_round,
                    match_order: order,
                    pool_id: None,
                    slots: [PlannedSlot::Entrant(home), PlannedSlot::Entrant(away)],
                });
                entries.push(PlannedSlot::WinnerOf(matches.len() - 1));
            }
            (Some(bye), None) | (None, Some(bye)) => entries.push(PlannedSlot::Entrant(bye)),
            (None, None) => {}
        }
    }

    for round in 1..rounds {
        let round_type = RoundType::for_bracket_round(size >> round);
        let mut next = Vec::with_capacity(entries.len() / 2);
        for (idx, pair) in entries.chunks(2).enumerate() {
            matches.push(PlannedMatch {
                phase: MatchPhase::Elimination,
                round_type,
                round_number: first_round + round,
                match_order: idx as u32 + 1,
                pool_id: None,
                slots: [pair[0], pair[1]],
            });
            next.push(PlannedSlot::WinnerOf(matches.len() - 1));
        }
        entries = next;
    }

    if third_place {
        if let Some(final_idx) = matches.len().checked_sub(1) {
            if let [PlannedSlot::WinnerOf(semi_a), PlannedSlot::WinnerOf(semi_b)] =
                matches[final_idx].slots
            {
                // Played before the final on the same round.
                let final_round = matches[final_idx].round_number;
                matches[final_idx].match_order = 2;
                matches.push(PlannedMatch {
                    phase: MatchPhase::Elimination,
                    round_type: RoundType::ThirdPlace,
                    round_number: final_round,
                    match_order: 1,
                    pool_id: None,
                    slots: [PlannedSlot::LoserOf(semi_a), PlannedSlot::LoserOf(semi_b)],
                });
            }
        }
    }

    DrawPlan {
        matches,
        shape: BracketShape::Elimination {
            bracket_size: size,
            rounds,
            byes: size - entrants,
        },
        pools: Vec::new(),
    }
}

/// Number of pools needed to keep every pool at or under `pool_size`
pub fn pool_count(entrants: usize, pool_size: usize) -> usize {
    entrants.div_ceil(pool_size.max(1)).max(1)
}

/// Distribute ranked entrants over `pools` pools in serpentine order so the
/// strongest entrants are spread evenly.
pub fn partition_pools(ranked: &[RegistrationId], pools: usize) -> Vec<Vec<RegistrationId>> {
    let pools = pools.max(1);
    let mut buckets = vec![Vec::new(); pools];
    for (idx, &registration) in ranked.iter().enumerate() {
        let row = idx / pools;
        let col = idx % pools;
        let pool = if row % 2 == 0 { col } else { pools - 1 - col };
        buckets[pool].push(registration);
    }
    buckets
}

/// Round-robin pairings using the circle method. Odd-sized groups get a
/// dummy entrant; pairings against it are dropped.
pub fn round_robin_rounds(entrants: &[RegistrationId]) -> Vec<Vec<(RegistrationId, RegistrationId)>> {
    let mut ring: Vec<Option<RegistrationId>> = entrants.iter().copied().map(Some).collect();
    if ring.len() % 2 == 1 {
        ring.push(None);
    }
    let n = ring.len();
    if n < 2 {
        return Vec::new();
    }

    let mut rounds = Vec::with_capacity(n - 1);
    for round in 0..n - 1 {
        let mut pairs = Vec::with_capacity(n / 2);
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (ring[i], ring[n - 1 - i]) {
                // The fixed entrant alternates home and away.
                if i == 0 && round % 2 == 1 {
                    pairs.push((b, a));
                } else {
                    pairs.push((a, b));
                }
            }
        }
        rounds.push(pairs);
        ring[1..].rotate_right(1);
    }
    rounds
}

/// Round-robin pools for `ranked`. `advance_per_pool` is only recorded in
/// the shape; the knockout is planned once the pools have finished.
pub fn pool_plan(ranked: &[RegistrationId], pool_size: usize, advance_per_pool: Option<u32>) -> DrawPlan {
    let pools = partition_pools(ranked, pool_count(ranked.len(), pool_size));
    let schedules: Vec<_> = pools.iter().map(|pool| round_robin_rounds(pool)).collect();
    let rounds = schedules.iter().map(Vec::len).max().unwrap_or(0);

    let mut matches = Vec::new();
    for round in 0..rounds {
        let mut order = 0;
        for (pool_idx, schedule) in schedules.iter().enumerate() {
            let Some(pairs) = schedule.get(round) else {
                continue;
            };
            for &(home, away) in pairs {
                order += 1;
                matches.push(PlannedMatch {
                    phase: MatchPhase::Pool,
                    round_type: RoundType::Pool,
                    round_number: round as u32 + 1,
                    match_order: order,
                    pool_id: Some(pool_idx as u32 + 1),
                    slots: [PlannedSlot::Entrant(home), PlannedSlot::Entrant(away)],
                });
            }
        }
    }

    DrawPlan {
        matches,
        shape: BracketShape::Pools {
            pool_sizes: pools.iter().map(|p| p.len() as u32).collect(),
            rounds: rounds as u32,
            advance_per_pool,
        },
        pools,
    }
}
