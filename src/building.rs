//! Building aggregate: task ownership and point-capacity accounting.
//!
//! A building owns a list of tasks and a level that caps how many settled
//! points it can hold. Planned and concluded totals can also be rolled up
//! across a squad's buildings or across every task a user touches.

use serde::{Deserialize, Serialize};

use crate::fields::BuildingType;
use crate::scoring;
use crate::state::GameState;
use crate::task::Task;

/// A building on the city grid, owning a kanban board of tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: u64,
    pub name: String,
    pub kind: BuildingType,
    pub level: u32,
    pub owner: Option<String>,
    pub squad: Option<String>,
    /// Running total of settled points, bumped once per settlement. The
    /// per-task history is the audit log; its sum always equals this.
    #[serde(default)]
    pub settled_points: u64,
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub created_at_utc: i64,
}

impl Building {
    pub fn capacity(&self) -> u64 {
        scoring::capacity_for_level(self.level)
    }

    pub fn remaining_capacity(&self) -> u64 {
        self.capacity().saturating_sub(self.settled_points)
    }

    pub fn get_task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Live estimate: sum of base points over every task still in flight.
    pub fn planned_points(&self) -> u64 {
        planned_over(self.tasks.iter())
    }

    /// Audit sum across every task's settlement history.
    pub fn history_points(&self) -> u64 {
        self.tasks.iter().map(Task::history_points).sum()
    }
}

/// Aggregation scope for planned/concluded point queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Building(u64),
    Squad(String),
    User(String),
}

/// Tasks visible in a scope: one building's board, every task tagged with a
/// squad, or every task a user created or participates in.
pub fn tasks_in_scope<'a>(state: &'a GameState, scope: &Scope) -> Vec<&'a Task> {
    match scope {
        Scope::Building(id) => state
            .building(*id)
            .map(|b| b.tasks.iter().collect())
            .unwrap_or_default(),
        Scope::Squad(squad) => state
            .buildings
            .iter()
            .flat_map(|b| b.tasks.iter())
            .filter(|t| &t.squad == squad)
            .collect(),
        Scope::User(user) => state
            .buildings
            .iter()
            .flat_map(|b| b.tasks.iter())
            .filter(|t| &t.creator == user || t.participants.iter().any(|p| p == user))
            .collect(),
    }
}

/// Sum of point estimates over the scope's unfinished tasks.
pub fn planned_points(state: &GameState, scope: &Scope) -> u64 {
    planned_over(tasks_in_scope(state, scope).into_iter())
}

/// Sum of settled points over the scope. For a single building this is the
/// denormalized counter; wider scopes replay the audit histories.
pub fn concluded_points(state: &GameState, scope: &Scope) -> u64 {
    match scope {
        Scope::Building(id) => state.building(*id).map_or(0, |b| b.settled_points),
        _ => tasks_in_scope(state, scope)
            .iter()
            .map(|t| t.history_points())
            .sum(),
    }
}

fn planned_over<'a>(tasks: impl Iterator<Item = &'a Task>) -> u64 {
    tasks
        .filter(|t| t.status != crate::fields::Status::Done)
        .map(|t| scoring::estimate_points(t))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;
    use crate::state::test_support::{sample_state, sample_task};
    use crate::task::Rule;

    #[test]
    fn planned_points_skip_done_tasks() {
        let mut state = sample_state();
        let mut open = sample_task(1, Rule::Integrated);
        open.size = 5;
        open.complexity = 2;
        let mut done = sample_task(2, Rule::Integrated);
        done.status = Status::Done;
        state.buildings[0].tasks.push(open);
        state.buildings[0].tasks.push(done);

        assert_eq!(state.buildings[0].planned_points(), 10);
        assert_eq!(planned_points(&state, &Scope::Building(1)), 10);
    }

    #[test]
    fn squad_scope_spans_buildings() {
        let mut state = sample_state();
        let second = Building {
            id: 2,
            name: "Annex".into(),
            kind: BuildingType::Product,
            level: 1,
            owner: None,
            squad: Some("atlas".into()),
            settled_points: 0,
            tasks: Vec::new(),
            created_at_utc: 0,
        };
        state.buildings.push(second);
        state.buildings[0].tasks.push(sample_task(1, Rule::Integrated));
        state.buildings[1].tasks.push(sample_task(2, Rule::Integrated));
        let mut foreign = sample_task(3, Rule::Integrated);
        foreign.squad = "titan".into();
        state.buildings[1].tasks.push(foreign);

        let squad_tasks = tasks_in_scope(&state, &Scope::Squad("atlas".into()));
        assert_eq!(squad_tasks.len(), 2);
    }

    #[test]
    fn user_scope_matches_creator_or_participant() {
        let mut state = sample_state();
        let mut created = sample_task(1, Rule::Integrated);
        created.creator = "bruno".into();
        let mut participating = sample_task(2, Rule::Integrated);
        participating.participants = vec!["ana".into(), "bruno".into()];
        let unrelated = sample_task(3, Rule::Integrated);
        state.buildings[0].tasks.push(created);
        state.buildings[0].tasks.push(participating);
        state.buildings[0].tasks.push(unrelated);

        let mine = tasks_in_scope(&state, &Scope::User("bruno".into()));
        assert_eq!(mine.len(), 2);
    }

    #[test]
    fn building_capacity_follows_level() {
        let mut state = sample_state();
        assert_eq!(state.buildings[0].capacity(), 100);
        state.buildings[0].level = 3;
        assert_eq!(state.buildings[0].capacity(), 400);
        state.buildings[0].settled_points = 390;
        assert_eq!(state.buildings[0].remaining_capacity(), 10);
    }
}
