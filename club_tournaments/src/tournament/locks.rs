//! In-process single-writer guard per tournament.

use super::models::TournamentId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of tournaments currently held by a scheduling pass
#[derive(Debug, Clone, Default)]
pub struct TournamentLocks {
    held: Arc<Mutex<HashSet<TournamentId>>>,
}

impl TournamentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the tournament without waiting; `None` if someone holds it
    pub fn try_acquire(&self, tournament_id: TournamentId) -> Option<TournamentGuard> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        if !held.insert(tournament_id) {
            return None;
        }
        Some(TournamentGuard {
            held: Arc::clone(&self.held),
            tournament_id,
        })
    }

    pub fn is_held(&self, tournament_id: TournamentId) -> bool {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&tournament_id)
    }
}

/// Releases the tournament on drop
#[derive(Debug)]
pub struct TournamentGuard {
    held: Arc<Mutex<HashSet<TournamentId>>>,
    tournament_id: TournamentId,
}

impl TournamentGuard {
    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }
}

impl Drop for TournamentGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.tournament_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected() {
        let locks = TournamentLocks::new();
        let guard = locks.try_acquire(1).expect("first acquire");
        assert!(locks.try_acquire(1).is_none());
        assert!(locks.try_acquire(2).is_some());
        assert_eq!(guard.tournament_id(), 1);
    }

    #[test]
    fn test_drop_releases() {
        let locks = TournamentLocks::new();
        {
            let _guard = locks.try_acquire(7).unwrap();
            assert!(locks.is_held(7));
        }
        assert!(!locks.is_held(7));
        assert!(locks.try_acquire(7).is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let locks = TournamentLocks::new();
        let other = locks.clone();
        let _guard = locks.try_acquire(3).unwrap();
        assert!(other.try_acquire(3).is_none());
    }
}
