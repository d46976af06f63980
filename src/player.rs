//! Progression model: player profiles and derived squad stats.
//!
//! Player profiles are stored and mutated by settlement; squad progression
//! is never stored; it is recomputed from the task histories on demand so
//! it cannot drift from the underlying records.

use serde::{Deserialize, Serialize};

use crate::building::{self, Scope};
use crate::scoring;
use crate::state::GameState;

/// Per-user aggregate updated every time the user is credited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerProfile {
    pub level: u32,
    pub current_xp: u64,
    pub next_level_xp: u64,
    pub total_points: u64,
    pub reputation: f64,
    pub streak: u32,
    pub coins: u64,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        PlayerProfile {
            level: 1,
            current_xp: 0,
            next_level_xp: scoring::next_level_xp(1),
            total_points: 0,
            reputation: scoring::REPUTATION_SEED,
            streak: 0,
            coins: 0,
        }
    }
}

impl PlayerProfile {
    /// Apply one settlement share: points, coins, XP with level rollover,
    /// and the reputation moving average.
    pub fn credit(&mut self, points: u64, rating: u8) {
        self.total_points += points;
        self.coins += scoring::coins_for_points(points);
        self.current_xp += scoring::xp_for_points(points);
        while self.current_xp >= self.next_level_xp {
            self.current_xp -= self.next_level_xp;
            self.level += 1;
            self.next_level_xp = scoring::next_level_xp(self.level);
        }
        self.reputation = scoring::decay_reputation(self.reputation, rating);
    }

    pub fn reputation_stars(&self) -> u8 {
        scoring::reputation_stars(self.reputation)
    }

    /// Spend coins from the wallet; false when the balance is short.
    pub fn try_spend(&mut self, coins: u64) -> bool {
        if self.coins < coins {
            return false;
        }
        self.coins -= coins;
        true
    }
}

/// Squad progression derived from the squad's task records.
#[derive(Debug, Clone, PartialEq)]
pub struct SquadStats {
    pub planned_points: u64,
    pub concluded_points: u64,
    pub total_xp: u64,
    pub level: u32,
    pub xp_into_level: u64,
    pub next_level_xp: u64,
    pub average_rating: f64,
    pub settled_cycles: usize,
}

impl SquadStats {
    /// Recompute the squad's stats from every task tagged with the squad.
    pub fn derive(state: &GameState, squad_id: &str) -> SquadStats {
        let scope = Scope::Squad(squad_id.to_string());
        let tasks = building::tasks_in_scope(state, &scope);

        let total_xp: u64 = tasks
            .iter()
            .flat_map(|t| t.history.iter())
            .map(|h| h.xp)
            .sum();

        let mut level = 1u32;
        let mut cleared = 0u64;
        let mut next = scoring::squad_next_level_xp(level);
        while total_xp >= cleared + next {
            cleared += next;
            level += 1;
            next = scoring::squad_next_level_xp(level);
        }

        let settled_cycles: usize = tasks.iter().map(|t| t.history.len()).sum();
        let rating_sum: u64 = tasks
            .iter()
            .flat_map(|t| t.history.iter())
            .map(|h| u64::from(h.rating))
            .sum();
        let average_rating = if settled_cycles > 0 {
            rating_sum as f64 / settled_cycles as f64
        } else {
            0.0
        };

        SquadStats {
            planned_points: building::planned_points(state, &scope),
            concluded_points: building::concluded_points(state, &scope),
            total_xp,
            level,
            xp_into_level: total_xp - cleared,
            next_level_xp: next,
            average_rating,
            settled_cycles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{sample_state, sample_task};
    use crate::task::{HistoryEntry, Rule};

    #[test]
    fn single_level_rollover() {
        let mut profile = PlayerProfile {
            current_xp: 900,
            ..PlayerProfile::default()
        };
        profile.credit(25, 1); // 250 XP
        assert_eq!(profile.level, 2);
        assert_eq!(profile.current_xp, 150);
        assert_eq!(profile.next_level_xp, 1500);
        assert_eq!(profile.total_points, 25);
        assert_eq!(profile.coins, 25);
    }

    #[test]
    fn multi_level_rollover_in_one_credit() {
        let mut profile = PlayerProfile::default();
        profile.credit(1000, 2); // 10,000 XP
        // Thresholds cleared: 1000 + 1500 + 2250 + 3375 = 8125.
        assert_eq!(profile.level, 5);
        assert_eq!(profile.current_xp, 1875);
        assert_eq!(profile.next_level_xp, 5062);
    }

    #[test]
    fn reputation_follows_worked_examples() {
        let mut profile = PlayerProfile::default();
        profile.credit(0, 3);
        assert!((profile.reputation - 3.1).abs() < 1e-9);
        profile.credit(0, 0);
        assert!((profile.reputation - 2.995).abs() < 1e-9);
    }

    #[test]
    fn wallet_refuses_overdraft() {
        let mut profile = PlayerProfile::default();
        profile.coins = 100;
        assert!(!profile.try_spend(101));
        assert_eq!(profile.coins, 100);
        assert!(profile.try_spend(80));
        assert_eq!(profile.coins, 20);
    }

    #[test]
    fn squad_stats_derive_from_history() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Integrated);
        for sprint in 1..=2u32 {
            task.history.push(HistoryEntry {
                timestamp_utc: i64::from(sprint) * 100,
                rating: 2,
                points: 250,
                xp: 2500,
                coins: 250,
                participants: vec!["ana".into()],
                feedback: None,
                sprint,
            });
        }
        state.buildings[0].tasks.push(task);

        let stats = SquadStats::derive(&state, "atlas");
        assert_eq!(stats.total_xp, 5000);
        // 2000 + 3000 = 5000 cleared exactly, landing at level 3.
        assert_eq!(stats.level, 3);
        assert_eq!(stats.xp_into_level, 0);
        assert_eq!(stats.next_level_xp, 4500);
        assert_eq!(stats.settled_cycles, 2);
        assert!((stats.average_rating - 2.0).abs() < 1e-9);
        assert_eq!(stats.concluded_points, 500);
    }

    #[test]
    fn empty_squad_has_neutral_stats() {
        let state = sample_state();
        let stats = SquadStats::derive(&state, "atlas");
        assert_eq!(stats.level, 1);
        assert_eq!(stats.total_xp, 0);
        assert_eq!(stats.average_rating, 0.0);
    }
}
