//! Enumerations and field types for the task board.
//!
//! This module defines the structured data types used to classify tasks,
//! buildings and roster members: kanban statuses, collaboration rules,
//! supervisor ratings, recurrence periods and building kinds.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kanban column a task currently sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Backlog,
    Todo,
    Doing,
    Blocked,
    Review,
    Done,
}

impl Status {
    /// Board column order, left to right.
    pub const ALL: [Status; 6] = [
        Status::Backlog,
        Status::Todo,
        Status::Doing,
        Status::Blocked,
        Status::Review,
        Status::Done,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Backlog => "Backlog",
            Status::Todo => "To Do",
            Status::Doing => "Doing",
            Status::Blocked => "Blocked",
            Status::Review => "Review",
            Status::Done => "Done",
        }
    }

    /// Column index on the board.
    pub fn column(self) -> usize {
        match self {
            Status::Backlog => 0,
            Status::Todo => 1,
            Status::Doing => 2,
            Status::Blocked => 3,
            Status::Review => 4,
            Status::Done => 5,
        }
    }
}

/// Collaboration policy tag for a task.
///
/// Integrated tasks credit every participant with the full value, negotiated
/// tasks split points by an agreed distribution, and fixed tasks are
/// recurring templates that cycle back to the backlog after each settlement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    Integrated,
    Negotiated,
    Fixed,
}

impl RuleKind {
    pub fn label(self) -> &'static str {
        match self {
            RuleKind::Integrated => "Integrated (I)",
            RuleKind::Negotiated => "Negotiated (N)",
            RuleKind::Fixed => "Fixed (F)",
        }
    }
}

/// Recurrence period tag for deadline-limited fixed tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FixedPeriod {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

/// Which limiter tripped when a fixed task reached its renewal point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RenewalKind {
    Quantity,
    Time,
}

/// Supervisor rating assigned when grading a review task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Null,
    Basic,
    Relevant,
    Outstanding,
}

impl Rating {
    /// Parse a raw 0-3 rating value.
    pub fn from_value(value: u8) -> Option<Rating> {
        match value {
            0 => Some(Rating::Null),
            1 => Some(Rating::Basic),
            2 => Some(Rating::Relevant),
            3 => Some(Rating::Outstanding),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        match self {
            Rating::Null => 0,
            Rating::Basic => 1,
            Rating::Relevant => 2,
            Rating::Outstanding => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Null => "Null/Harmful",
            Rating::Basic => "Basic",
            Rating::Relevant => "Relevant",
            Rating::Outstanding => "Outstanding",
        }
    }
}

/// Kind of building on the city grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BuildingType {
    SquadHq,
    Residential,
    TribalCenter,
    Governance,
    People,
    Product,
    Market,
    Resources,
    Decoration,
}

impl BuildingType {
    pub fn label(self) -> &'static str {
        match self {
            BuildingType::SquadHq => "Squad HQ",
            BuildingType::Residential => "Residence",
            BuildingType::TribalCenter => "Tribal Center",
            BuildingType::Governance => "Governance",
            BuildingType::People => "People & Culture",
            BuildingType::Product => "Product Lab",
            BuildingType::Market => "Market Relations",
            BuildingType::Resources => "Infra & Resources",
            BuildingType::Decoration => "Decoration",
        }
    }
}

/// Roster role. Only masters may grade tasks or resolve renewals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Master,
    Mentor,
    Executor,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Master => "Master",
            Role::Mentor => "Mentor",
            Role::Executor => "Executor",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_round_trips_raw_values() {
        for v in 0..=3u8 {
            assert_eq!(Rating::from_value(v).unwrap().value(), v);
        }
        assert!(Rating::from_value(4).is_none());
    }

    #[test]
    fn status_columns_match_board_order() {
        for (i, s) in Status::ALL.iter().enumerate() {
            assert_eq!(s.column(), i);
        }
    }
}
