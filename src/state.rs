//! Game state store and persistence.
//!
//! This module provides the `GameState` struct holding the roster, player
//! profiles, buildings and sprint cycle, along with JSON load/save. All
//! engine operations take the state by reference; nothing mutates ambient
//! globals.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::building::Building;
use crate::fields::Role;
use crate::player::PlayerProfile;
use crate::scoring;
use crate::task::Task;

/// A roster member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub squad: String,
    pub role: Role,
}

/// A named squad grouping users and buildings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Squad {
    pub id: String,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

/// The whole persisted world: roster, profiles, buildings, sprint cycle.
#[derive(Debug, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub squads: Vec<Squad>,
    #[serde(default)]
    pub players: BTreeMap<String, PlayerProfile>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    pub sprint_cycle: u32,
    pub sprint_started_at_utc: i64,
}

impl GameState {
    pub fn new(now_utc: i64) -> Self {
        GameState {
            users: Vec::new(),
            squads: Vec::new(),
            players: BTreeMap::new(),
            buildings: Vec::new(),
            sprint_cycle: 1,
            sprint_started_at_utc: now_utc,
        }
    }

    /// Load state from a JSON file, starting a fresh world if the file does
    /// not exist or cannot be parsed.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return GameState::new(Utc::now().timestamp());
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(state) => state,
                Err(e) => {
                    eprintln!("Error parsing state, starting fresh: {e}");
                    GameState::new(Utc::now().timestamp())
                }
            },
            Err(e) => {
                eprintln!("Error reading state, starting fresh: {e}");
                GameState::new(Utc::now().timestamp())
            }
        }
    }

    /// Save state to a JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).unwrap();
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    pub fn building(&self, id: u64) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn building_mut(&mut self, id: u64) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    /// Find the building holding a task. Task IDs are unique world-wide.
    pub fn locate_task(&self, task_id: u64) -> Option<(u64, &Task)> {
        for building in &self.buildings {
            if let Some(task) = building.get_task(task_id) {
                return Some((building.id, task));
            }
        }
        None
    }

    pub fn next_task_id(&self) -> u64 {
        self.buildings
            .iter()
            .flat_map(|b| b.tasks.iter())
            .map(|t| t.id)
            .max()
            .unwrap_or(0)
            + 1
    }

    pub fn next_building_id(&self) -> u64 {
        self.buildings.iter().map(|b| b.id).max().unwrap_or(0) + 1
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn squad(&self, id: &str) -> Option<&Squad> {
        self.squads.iter().find(|s| s.id == id)
    }

    /// Profile for a user, created lazily on first credit.
    pub fn profile_mut(&mut self, user_id: &str) -> &mut PlayerProfile {
        self.players.entry(user_id.to_string()).or_default()
    }

    pub fn sprint_label(&self) -> String {
        format!("Sprint {}", self.sprint_cycle)
    }

    pub fn sprint_days_remaining(&self, now_utc: i64) -> i64 {
        let elapsed = (now_utc - self.sprint_started_at_utc) / 86_400;
        (scoring::SPRINT_DURATION_DAYS - elapsed).max(0)
    }

    pub fn advance_sprint(&mut self, now_utc: i64) {
        self.sprint_cycle += 1;
        self.sprint_started_at_utc = now_utc;
    }
}

/// Convert a display name to a roster/squad ID: lowercase, underscores.
pub fn slugify(display_name: &str) -> String {
    display_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
pub mod test_support {
    //! Shared fixtures for the engine test modules.

    use std::collections::BTreeMap;

    use super::{GameState, Squad, User};
    use crate::building::Building;
    use crate::fields::{BuildingType, Role, Status};
    use crate::task::{Rule, Task};

    /// One squad ("atlas"), three users (vera the master, ana, bruno) and an
    /// empty level-1 building with ID 1.
    pub fn sample_state() -> GameState {
        let mut state = GameState::new(0);
        state.squads.push(Squad {
            id: "atlas".into(),
            name: "Atlas".into(),
            color: "#3b82f6".into(),
            description: None,
        });
        for (id, name, role) in [
            ("vera", "Vera", Role::Master),
            ("ana", "Ana", Role::Executor),
            ("bruno", "Bruno", Role::Executor),
        ] {
            state.users.push(User {
                id: id.into(),
                name: name.into(),
                squad: "atlas".into(),
                role,
            });
        }
        state.buildings.push(Building {
            id: 1,
            name: "Launch Hub".into(),
            kind: BuildingType::Product,
            level: 1,
            owner: Some("vera".into()),
            squad: Some("atlas".into()),
            settled_points: 0,
            tasks: Vec::new(),
            created_at_utc: 0,
        });
        state
    }

    /// A size-3, complexity-2 backlog task created by ana (base 6 points).
    pub fn sample_task(id: u64, rule: Rule) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            description: None,
            status: Status::Backlog,
            creator: "ana".into(),
            assignee: None,
            squad: "atlas".into(),
            size: 3,
            complexity: 2,
            rule_multiplier: 1.0,
            rule,
            participants: Vec::new(),
            distribution: BTreeMap::new(),
            evidence_link: None,
            delivery_notes: None,
            reflections: None,
            settlement: None,
            pending_renewal: None,
            history: Vec::new(),
            sprint_history: Vec::new(),
            created_at_utc: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{sample_state, sample_task};
    use super::*;
    use crate::task::Rule;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = sample_state();
        state.buildings[0].tasks.push(sample_task(1, Rule::Integrated));
        state.profile_mut("ana").credit(10, 2);
        state.save(&path).unwrap();

        let loaded = GameState::load(&path);
        assert_eq!(loaded.users.len(), 3);
        assert_eq!(loaded.buildings[0].tasks.len(), 1);
        assert_eq!(loaded.players["ana"].total_points, 10);
        assert_eq!(loaded.sprint_cycle, 1);
    }

    #[test]
    fn missing_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let state = GameState::load(&dir.path().join("nope.json"));
        assert!(state.buildings.is_empty());
        assert_eq!(state.sprint_cycle, 1);
    }

    #[test]
    fn task_ids_are_unique_across_buildings() {
        let mut state = sample_state();
        state.buildings[0].tasks.push(sample_task(4, Rule::Integrated));
        assert_eq!(state.next_task_id(), 5);
        assert_eq!(state.locate_task(4).map(|(b, _)| b), Some(1));
        assert!(state.locate_task(9).is_none());
    }

    #[test]
    fn slugify_matches_roster_conventions() {
        assert_eq!(slugify("Ana Souza"), "ana_souza");
        assert_eq!(slugify("  Atlas-9  "), "atlas_9");
        assert_eq!(slugify("Équipe"), "équipe");
    }

    #[test]
    fn sprint_clock_counts_down() {
        let mut state = GameState::new(0);
        assert_eq!(state.sprint_days_remaining(0), 14);
        assert_eq!(state.sprint_days_remaining(5 * 86_400), 9);
        assert_eq!(state.sprint_days_remaining(30 * 86_400), 0);
        state.advance_sprint(30 * 86_400);
        assert_eq!(state.sprint_cycle, 2);
        assert_eq!(state.sprint_days_remaining(31 * 86_400), 13);
    }
}
