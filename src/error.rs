//! Typed errors for the settlement engine.
//!
//! All variants are expected, user-facing conditions: commands report them
//! and leave the state untouched. Nothing in the engine panics.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("building #{0} not found")]
    BuildingNotFound(u64),

    #[error("task #{0} not found")]
    TaskNotFound(u64),

    #[error("user '{0}' is not in the roster")]
    UserNotFound(String),

    #[error("building capacity reached: {accrued}/{capacity} points settled, task needs {required} more")]
    CapacityExceeded {
        accrued: u64,
        capacity: u64,
        required: u64,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("only a master may {0}")]
    NotPermitted(&'static str),

    #[error("insufficient coins: have {have}, need {need}")]
    InsufficientCoins { have: u64, need: u64 },
}
