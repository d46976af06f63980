//! Task data structure and related types.
//!
//! This module defines the core `Task` struct that represents a single card
//! on a building's kanban board, together with its collaboration rule, the
//! ephemeral settlement record and the append-only settlement history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fields::{FixedPeriod, RenewalKind, RuleKind, Status};

/// A kanban card owned by a building.
///
/// Tasks carry their scoring inputs (size, complexity, rule), the set of
/// participating users, and the durable settlement history that survives
/// recurring-task renewal cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub creator: String,
    pub assignee: Option<String>,
    pub squad: String,
    pub size: u32,
    pub complexity: u32,
    pub rule_multiplier: f64,
    pub rule: Rule,
    #[serde(default)]
    pub participants: Vec<String>,
    /// Per-participant point split for negotiated tasks.
    #[serde(default)]
    pub distribution: BTreeMap<String, u64>,
    pub evidence_link: Option<String>,
    pub delivery_notes: Option<String>,
    pub reflections: Option<String>,
    /// Present only while the task sits in Done and has not been renewed.
    #[serde(default)]
    pub settlement: Option<Settlement>,
    /// Two-phase renewal marker. While set, the task is frozen until a
    /// supervisor accepts or declines the renewal.
    #[serde(default)]
    pub pending_renewal: Option<RenewalKind>,
    /// Append-only audit log, one entry per settlement.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    /// Sprint labels this task has been worked in, in order.
    #[serde(default)]
    pub sprint_history: Vec<String>,
    pub created_at_utc: i64,
}

/// Collaboration rule, carrying the recurrence limiter for fixed tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Rule {
    Integrated,
    Negotiated,
    Fixed { limiter: FixedLimiter },
}

impl Rule {
    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Integrated => RuleKind::Integrated,
            Rule::Negotiated => RuleKind::Negotiated,
            Rule::Fixed { .. } => RuleKind::Fixed,
        }
    }
}

/// Renewal limiter for a fixed task. Exactly one mode applies: a completed
/// cycle count against a quota, or a deadline with a period tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum FixedLimiter {
    Quantity {
        limit: u32,
        #[serde(default)]
        count: u32,
    },
    Deadline {
        deadline_utc: i64,
        period: FixedPeriod,
    },
}

/// Result of grading a task, kept on the task while it is Done.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub rating: u8,
    pub feedback: Option<String>,
    pub final_points: u64,
    pub final_xp: u64,
    pub final_coins: u64,
    pub settled_at_utc: i64,
}

/// One settled cycle in a task's history. Never truncated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub timestamp_utc: i64,
    pub rating: u8,
    pub points: u64,
    pub xp: u64,
    pub coins: u64,
    pub participants: Vec<String>,
    pub feedback: Option<String>,
    pub sprint: u32,
}

impl Task {
    /// Participant set used for crediting. An empty list falls back to the
    /// creator alone.
    pub fn participants_or_creator(&self) -> Vec<String> {
        if self.participants.is_empty() {
            vec![self.creator.clone()]
        } else {
            self.participants.clone()
        }
    }

    /// Clear the ephemeral per-cycle fields so the next cycle starts clean.
    /// The limiter state and history are untouched.
    pub fn clear_cycle_fields(&mut self) {
        self.settlement = None;
        self.evidence_link = None;
        self.delivery_notes = None;
        self.reflections = None;
    }

    /// A task whose settlement has been recorded and which is not awaiting
    /// a renewal decision is permanently done.
    pub fn is_permanently_done(&self) -> bool {
        self.status == Status::Done
            && self.settlement.is_some()
            && self.pending_renewal.is_none()
    }

    /// Sum of points in the settlement history.
    pub fn history_points(&self) -> u64 {
        self.history.iter().map(|h| h.points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;

    fn bare_task(rule: Rule) -> Task {
        Task {
            id: 1,
            title: "Write onboarding guide".into(),
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

    #[test]
    fn empty_participants_fall_back_to_creator() {
        let mut task = bare_task(Rule::Integrated);
        assert_eq!(task.participants_or_creator(), vec!["ana".to_string()]);
        task.participants = vec!["bruno".into(), "carla".into()];
        assert_eq!(task.participants_or_creator().len(), 2);
    }

    #[test]
    fn clearing_cycle_fields_preserves_history_and_limiter() {
        let mut task = bare_task(Rule::Fixed {
            limiter: FixedLimiter::Quantity { limit: 3, count: 2 },
        });
        task.settlement = Some(Settlement {
            rating: 2,
            feedback: Some("solid".into()),
            final_points: 9,
            final_xp: 90,
            final_coins: 9,
            settled_at_utc: 100,
        });
        task.evidence_link = Some("https://example.com/doc".into());
        task.history.push(HistoryEntry {
            timestamp_utc: 100,
            rating: 2,
            points: 9,
            xp: 90,
            coins: 9,
            participants: vec!["ana".into()],
            feedback: None,
            sprint: 1,
        });

        task.clear_cycle_fields();

        assert!(task.settlement.is_none());
        assert!(task.evidence_link.is_none());
        assert_eq!(task.history.len(), 1);
        assert_eq!(
            task.rule,
            Rule::Fixed { limiter: FixedLimiter::Quantity { limit: 3, count: 2 } }
        );
    }

    #[test]
    fn settled_done_task_is_permanent() {
        let mut task = bare_task(Rule::Integrated);
        task.status = Status::Done;
        assert!(!task.is_permanently_done()); // dragged to Done, never graded
        task.settlement = Some(Settlement {
            rating: 1,
            feedback: None,
            final_points: 6,
            final_xp: 60,
            final_coins: 6,
            settled_at_utc: 0,
        });
        assert!(task.is_permanently_done());
        task.pending_renewal = Some(RenewalKind::Quantity);
        assert!(!task.is_permanently_done()); // frozen, decision pending
    }
}
