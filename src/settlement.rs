//! Settlement engine: task lifecycle moves, grading and renewal.
//!
//! Grading is the only privileged, multi-step transaction in the system: it
//! checks capacity, converts the supervisor's rating into per-participant
//! rewards, credits every participant's profile, appends the audit history
//! and decides where the task goes next. Every function here validates
//! completely before touching the state, so an error always means nothing
//! changed.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::fields::{Rating, RenewalKind, Role, RuleKind, Status};
use crate::scoring;
use crate::state::GameState;
use crate::task::{FixedLimiter, HistoryEntry, Rule, Settlement};

/// What a settlement produced, for display and renewal follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementOutcome {
    pub task_id: u64,
    pub rating: u8,
    pub task_points: u64,
    pub task_xp: u64,
    pub task_coins: u64,
    /// Final points credited to each participant.
    pub shares: BTreeMap<String, u64>,
    pub next_status: Status,
    /// Set when a fixed task hit its limit and awaits a renewal decision.
    pub renewal_pending: Option<RenewalKind>,
}

/// Move a task to another kanban column.
///
/// Moves are free-form except that a settled task never leaves Done, a task
/// awaiting a renewal decision is frozen, and a negotiated task cannot enter
/// Review until its point split adds up. The first move out of the backlog
/// in a sprint stamps the sprint label onto the task.
pub fn move_task(
    state: &mut GameState,
    building_id: u64,
    task_id: u64,
    target: Status,
) -> Result<(), EngineError> {
    let (b_idx, t_idx) = locate(state, building_id, task_id)?;
    let sprint_label = state.sprint_label();

    let task = &state.buildings[b_idx].tasks[t_idx];
    if task.pending_renewal.is_some() {
        return Err(EngineError::InvalidState(format!(
            "task #{task_id} is awaiting a renewal decision"
        )));
    }
    if task.is_permanently_done() && target != Status::Done {
        return Err(EngineError::InvalidState(format!(
            "task #{task_id} is settled and permanently done"
        )));
    }
    if target == Status::Review && task.rule.kind() == RuleKind::Negotiated {
        let base = scoring::base_points(task.size, task.complexity, task.rule_multiplier);
        let declared: u64 = task.distribution.values().sum();
        if declared != base {
            return Err(EngineError::Validation(format!(
                "negotiated split totals {declared} points but the task is worth {base}; \
                 fix the distribution before review"
            )));
        }
    }

    let task = &mut state.buildings[b_idx].tasks[t_idx];
    if task.status == Status::Backlog
        && target != Status::Backlog
        && !task.sprint_history.contains(&sprint_label)
    {
        task.sprint_history.push(sprint_label);
    }
    task.status = target;
    Ok(())
}

/// Grade a review task and distribute its rewards.
///
/// Only masters may settle. The capacity precondition compares the
/// building's settled-point counter plus the task's base value against the
/// level ceiling; on rejection the task and every profile are untouched.
pub fn settle(
    state: &mut GameState,
    building_id: u64,
    task_id: u64,
    rating: Rating,
    feedback: Option<String>,
    acting_user: &str,
    now_utc: i64,
) -> Result<SettlementOutcome, EngineError> {
    require_master(state, acting_user, "settle a task")?;
    let (b_idx, t_idx) = locate(state, building_id, task_id)?;

    // Validation phase: nothing below mutates until every check has passed.
    let building = &state.buildings[b_idx];
    let task = &building.tasks[t_idx];
    if task.status != Status::Review {
        return Err(EngineError::InvalidState(format!(
            "task #{task_id} is in {}; only review tasks can be graded",
            task.status.label()
        )));
    }

    let base = scoring::base_points(task.size, task.complexity, task.rule_multiplier);
    let capacity = building.capacity();
    let accrued = building.settled_points;
    if accrued + base > capacity {
        return Err(EngineError::CapacityExceeded {
            accrued,
            capacity,
            required: base,
        });
    }

    let rating_value = rating.value();
    let participants = task.participants_or_creator();
    let negotiated = task.rule.kind() == RuleKind::Negotiated;
    let mut shares: BTreeMap<String, u64> = BTreeMap::new();
    for user in &participants {
        let share_base = if negotiated {
            task.distribution.get(user).copied().unwrap_or(0)
        } else {
            base
        };
        shares.insert(user.clone(), scoring::scale_points(share_base, rating_value));
    }
    let task_points = if negotiated {
        shares.values().sum()
    } else {
        scoring::scale_points(base, rating_value)
    };
    let task_xp = scoring::xp_for_points(task_points);
    let task_coins = scoring::coins_for_points(task_points);
    let sprint = state.sprint_cycle;

    // Mutation phase: infallible from here on.
    for (user, points) in &shares {
        state.profile_mut(user).credit(*points, rating_value);
    }

    let building = &mut state.buildings[b_idx];
    building.settled_points += task_points;
    let task = &mut building.tasks[t_idx];
    task.history.push(HistoryEntry {
        timestamp_utc: now_utc,
        rating: rating_value,
        points: task_points,
        xp: task_xp,
        coins: task_coins,
        participants: participants.clone(),
        feedback: feedback.clone(),
        sprint,
    });

    // For fixed tasks, bump the cycle count and check the limiter.
    let fixed_limit = match &mut task.rule {
        Rule::Fixed { limiter } => Some(match limiter {
            FixedLimiter::Quantity { limit, count } => {
                *count += 1;
                if *count >= *limit {
                    Some(RenewalKind::Quantity)
                } else {
                    None
                }
            }
            FixedLimiter::Deadline { deadline_utc, .. } => {
                if now_utc >= *deadline_utc {
                    Some(RenewalKind::Time)
                } else {
                    None
                }
            }
        }),
        _ => None,
    };

    let mut renewal_pending = None;
    let next_status = match fixed_limit {
        // Ordinary task: permanent record.
        None => {
            task.settlement = Some(Settlement {
                rating: rating_value,
                feedback,
                final_points: task_points,
                final_xp: task_xp,
                final_coins: task_coins,
                settled_at_utc: now_utc,
            });
            Status::Done
        }
        // Fixed task under its limit: back to the backlog, clean slate.
        Some(None) => {
            task.clear_cycle_fields();
            Status::Backlog
        }
        // Fixed task at its limit: record the cycle and wait for the
        // supervisor's renewal decision.
        Some(Some(kind)) => {
            task.settlement = Some(Settlement {
                rating: rating_value,
                feedback,
                final_points: task_points,
                final_xp: task_xp,
                final_coins: task_coins,
                settled_at_utc: now_utc,
            });
            task.pending_renewal = Some(kind);
            renewal_pending = Some(kind);
            Status::Done
        }
    };
    task.status = next_status;

    Ok(SettlementOutcome {
        task_id,
        rating: rating_value,
        task_points,
        task_xp,
        task_coins,
        shares,
        next_status,
        renewal_pending,
    })
}

/// Resolve the renewal decision for a fixed task that hit its limit.
///
/// Accepting resets the quantity count (or extends the deadline by a week)
/// and returns the task to the backlog clean; declining leaves it done for
/// good. Returns the task's resulting status.
pub fn resolve_renewal(
    state: &mut GameState,
    building_id: u64,
    task_id: u64,
    accept: bool,
    acting_user: &str,
    now_utc: i64,
) -> Result<Status, EngineError> {
    require_master(state, acting_user, "resolve a renewal")?;
    let (b_idx, t_idx) = locate(state, building_id, task_id)?;

    let task = &mut state.buildings[b_idx].tasks[t_idx];
    if task.pending_renewal.is_none() {
        return Err(EngineError::InvalidState(format!(
            "task #{task_id} is not awaiting a renewal decision"
        )));
    }
    task.pending_renewal = None;

    if accept {
        match &mut task.rule {
            Rule::Fixed { limiter: FixedLimiter::Quantity { count, .. } } => *count = 0,
            Rule::Fixed { limiter: FixedLimiter::Deadline { deadline_utc, .. } } => {
                *deadline_utc = now_utc + scoring::RENEWAL_EXTENSION_DAYS * 86_400;
            }
            _ => {}
        }
        task.clear_cycle_fields();
        task.status = Status::Backlog;
    } else {
        task.status = Status::Done;
    }
    Ok(task.status)
}

fn locate(
    state: &GameState,
    building_id: u64,
    task_id: u64,
) -> Result<(usize, usize), EngineError> {
    let b_idx = state
        .buildings
        .iter()
        .position(|b| b.id == building_id)
        .ok_or(EngineError::BuildingNotFound(building_id))?;
    let t_idx = state.buildings[b_idx]
        .tasks
        .iter()
        .position(|t| t.id == task_id)
        .ok_or(EngineError::TaskNotFound(task_id))?;
    Ok((b_idx, t_idx))
}

fn require_master(
    state: &GameState,
    user_id: &str,
    action: &'static str,
) -> Result<(), EngineError> {
    let user = state
        .user(user_id)
        .ok_or_else(|| EngineError::UserNotFound(user_id.to_string()))?;
    if user.role != Role::Master {
        return Err(EngineError::NotPermitted(action));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::{concluded_points, Scope};
    use crate::fields::FixedPeriod;
    use crate::scoring::estimate_points;
    use crate::state::test_support::{sample_state, sample_task};
    use crate::task::Rule;

    const B: u64 = 1;

    fn push_review_task(state: &mut GameState, id: u64, rule: Rule) {
        let mut task = sample_task(id, rule);
        task.status = Status::Review;
        state.buildings[0].tasks.push(task);
    }

    #[test]
    fn estimate_matches_settled_base_for_basic_rating() {
        let mut state = sample_state();
        push_review_task(&mut state, 1, Rule::Integrated);
        let estimate = estimate_points(&state.buildings[0].tasks[0]);

        let outcome =
            settle(&mut state, B, 1, Rating::Basic, None, "vera", 100).unwrap();
        assert_eq!(outcome.task_points, estimate);
        assert_eq!(outcome.shares["ana"], estimate);
        // The settled task keeps reporting the same value.
        assert_eq!(estimate_points(&state.buildings[0].tasks[0]), estimate);
    }

    #[test]
    fn settle_requires_review_status() {
        let mut state = sample_state();
        state.buildings[0].tasks.push(sample_task(1, Rule::Integrated));
        let err = settle(&mut state, B, 1, Rating::Basic, None, "vera", 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn settle_is_master_only() {
        let mut state = sample_state();
        push_review_task(&mut state, 1, Rule::Integrated);
        let err = settle(&mut state, B, 1, Rating::Basic, None, "ana", 0).unwrap_err();
        assert_eq!(err, EngineError::NotPermitted("settle a task"));
        let err = settle(&mut state, B, 1, Rating::Basic, None, "ghost", 0).unwrap_err();
        assert_eq!(err, EngineError::UserNotFound("ghost".into()));
    }

    #[test]
    fn capacity_overflow_rejects_without_mutation() {
        let mut state = sample_state();
        state.buildings[0].settled_points = 95; // level 1 capacity is 100
        push_review_task(&mut state, 1, Rule::Integrated); // base 6 > remaining 5

        let err = settle(&mut state, B, 1, Rating::Outstanding, None, "vera", 0).unwrap_err();
        assert_eq!(
            err,
            EngineError::CapacityExceeded { accrued: 95, capacity: 100, required: 6 }
        );
        assert_eq!(concluded_points(&state, &Scope::Building(B)), 95);
        assert_eq!(state.buildings[0].tasks[0].status, Status::Review);
        assert!(state.buildings[0].tasks[0].history.is_empty());
        assert!(state.players.get("ana").is_none());
    }

    #[test]
    fn every_participant_is_credited_in_full_on_integrated_tasks() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Integrated);
        task.status = Status::Review;
        task.participants = vec!["ana".into(), "bruno".into()];
        state.buildings[0].tasks.push(task);

        let outcome =
            settle(&mut state, B, 1, Rating::Relevant, None, "vera", 0).unwrap();
        // base 6 × 1.5 = 9, full credit each; the task itself settles once.
        assert_eq!(outcome.shares["ana"], 9);
        assert_eq!(outcome.shares["bruno"], 9);
        assert_eq!(outcome.task_points, 9);
        assert_eq!(state.players["ana"].total_points, 9);
        assert_eq!(state.players["bruno"].total_points, 9);
        assert_eq!(state.players["ana"].current_xp, 90);
        assert_eq!(state.players["ana"].coins, 9);
        assert_eq!(state.buildings[0].settled_points, 9);
    }

    #[test]
    fn negotiated_shares_follow_the_declared_split() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Negotiated); // base 6
        task.status = Status::Review;
        task.participants = vec!["ana".into(), "bruno".into()];
        task.distribution.insert("ana".into(), 4);
        task.distribution.insert("bruno".into(), 2);
        state.buildings[0].tasks.push(task);

        let outcome =
            settle(&mut state, B, 1, Rating::Relevant, None, "vera", 0).unwrap();
        assert_eq!(outcome.shares["ana"], 6); // 4 × 1.5
        assert_eq!(outcome.shares["bruno"], 3); // 2 × 1.5
        assert_eq!(outcome.task_points, 9);
        assert_eq!(state.buildings[0].settled_points, 9);
    }

    #[test]
    fn negotiated_under_declared_split_still_settles() {
        // No hard block at settlement time: participants receive exactly
        // their declared share, absentees receive nothing.
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Negotiated); // base 6
        task.status = Status::Review;
        task.participants = vec!["ana".into(), "bruno".into()];
        task.distribution.insert("ana".into(), 3); // bruno undeclared
        state.buildings[0].tasks.push(task);

        let outcome = settle(&mut state, B, 1, Rating::Basic, None, "vera", 0).unwrap();
        assert_eq!(outcome.shares["ana"], 3);
        assert_eq!(outcome.shares["bruno"], 0);
        assert_eq!(outcome.task_points, 3);
    }

    #[test]
    fn null_rating_pays_nothing_but_still_records() {
        let mut state = sample_state();
        push_review_task(&mut state, 1, Rule::Integrated);
        let outcome = settle(&mut state, B, 1, Rating::Null, None, "vera", 0).unwrap();
        assert_eq!(outcome.task_points, 0);
        assert_eq!(state.players["ana"].total_points, 0);
        // Reputation still reacts to the poor rating.
        assert!(state.players["ana"].reputation < 3.0);
        assert_eq!(state.buildings[0].tasks[0].history.len(), 1);
    }

    #[test]
    fn fixed_task_cycles_back_until_quota() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Fixed {
            limiter: FixedLimiter::Quantity { limit: 3, count: 0 },
        });
        task.status = Status::Review;
        state.buildings[0].tasks.push(task);

        for cycle in 1..=2u32 {
            let outcome =
                settle(&mut state, B, 1, Rating::Basic, None, "vera", i64::from(cycle))
                    .unwrap();
            assert_eq!(outcome.next_status, Status::Backlog);
            assert!(outcome.renewal_pending.is_none());
            let task = &state.buildings[0].tasks[0];
            assert!(task.settlement.is_none());
            assert_eq!(task.history.len(), cycle as usize);
            move_task(&mut state, B, 1, Status::Review).unwrap();
        }

        let outcome = settle(&mut state, B, 1, Rating::Basic, None, "vera", 3).unwrap();
        assert_eq!(outcome.next_status, Status::Done);
        assert_eq!(outcome.renewal_pending, Some(RenewalKind::Quantity));
        let task = &state.buildings[0].tasks[0];
        assert_eq!(task.pending_renewal, Some(RenewalKind::Quantity));
        assert!(task.settlement.is_some());
    }

    #[test]
    fn renewal_cycles_preserve_history_and_points() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Fixed {
            limiter: FixedLimiter::Quantity { limit: 1, count: 0 },
        });
        task.status = Status::Review;
        state.buildings[0].tasks.push(task);

        for cycle in 1..=3i64 {
            let outcome = settle(&mut state, B, 1, Rating::Basic, None, "vera", cycle).unwrap();
            assert_eq!(outcome.renewal_pending, Some(RenewalKind::Quantity));
            let status = resolve_renewal(&mut state, B, 1, true, "vera", cycle).unwrap();
            assert_eq!(status, Status::Backlog);
            let task = &state.buildings[0].tasks[0];
            assert!(task.settlement.is_none());
            assert!(task.evidence_link.is_none());
            move_task(&mut state, B, 1, Status::Review).unwrap();
        }

        let task = &state.buildings[0].tasks[0];
        assert_eq!(task.history.len(), 3);
        // Each cycle settled 6 points; nothing from past cycles is lost.
        assert_eq!(concluded_points(&state, &Scope::Building(B)), 18);
        assert_eq!(state.buildings[0].settled_points, task.history_points());
        assert_eq!(state.players["ana"].total_points, 18);
    }

    #[test]
    fn deadline_limited_task_prompts_on_expiry() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Fixed {
            limiter: FixedLimiter::Deadline { deadline_utc: 1_000, period: FixedPeriod::Weekly },
        });
        task.status = Status::Review;
        state.buildings[0].tasks.push(task);

        // Before the deadline: plain cycle.
        let outcome = settle(&mut state, B, 1, Rating::Basic, None, "vera", 500).unwrap();
        assert_eq!(outcome.next_status, Status::Backlog);

        move_task(&mut state, B, 1, Status::Review).unwrap();
        let outcome = settle(&mut state, B, 1, Rating::Basic, None, "vera", 1_000).unwrap();
        assert_eq!(outcome.renewal_pending, Some(RenewalKind::Time));

        // Accepting pushes the deadline out a week from now.
        resolve_renewal(&mut state, B, 1, true, "vera", 2_000).unwrap();
        match &state.buildings[0].tasks[0].rule {
            Rule::Fixed { limiter: FixedLimiter::Deadline { deadline_utc, .. } } => {
                assert_eq!(*deadline_utc, 2_000 + 7 * 86_400);
            }
            other => panic!("limiter changed shape: {other:?}"),
        }
    }

    #[test]
    fn declined_renewal_is_terminal() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Fixed {
            limiter: FixedLimiter::Quantity { limit: 1, count: 0 },
        });
        task.status = Status::Review;
        state.buildings[0].tasks.push(task);

        settle(&mut state, B, 1, Rating::Basic, None, "vera", 0).unwrap();
        let status = resolve_renewal(&mut state, B, 1, false, "vera", 0).unwrap();
        assert_eq!(status, Status::Done);

        // No second decision, no further grading, no moving it back.
        let err = resolve_renewal(&mut state, B, 1, true, "vera", 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        let err = settle(&mut state, B, 1, Rating::Basic, None, "vera", 0).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        let err = move_task(&mut state, B, 1, Status::Backlog).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[test]
    fn task_awaiting_renewal_is_frozen() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Fixed {
            limiter: FixedLimiter::Quantity { limit: 1, count: 0 },
        });
        task.status = Status::Review;
        state.buildings[0].tasks.push(task);
        settle(&mut state, B, 1, Rating::Basic, None, "vera", 0).unwrap();

        let err = move_task(&mut state, B, 1, Status::Doing).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
        let err = resolve_renewal(&mut state, B, 1, true, "ana", 0).unwrap_err();
        assert_eq!(err, EngineError::NotPermitted("resolve a renewal"));
    }

    #[test]
    fn sprint_label_is_stamped_once_per_sprint() {
        let mut state = sample_state();
        state.buildings[0].tasks.push(sample_task(1, Rule::Integrated));

        move_task(&mut state, B, 1, Status::Doing).unwrap();
        move_task(&mut state, B, 1, Status::Backlog).unwrap();
        move_task(&mut state, B, 1, Status::Doing).unwrap();
        assert_eq!(state.buildings[0].tasks[0].sprint_history, vec!["Sprint 1"]);

        move_task(&mut state, B, 1, Status::Backlog).unwrap();
        state.advance_sprint(86_400 * 14);
        move_task(&mut state, B, 1, Status::Todo).unwrap();
        assert_eq!(
            state.buildings[0].tasks[0].sprint_history,
            vec!["Sprint 1", "Sprint 2"]
        );
    }

    #[test]
    fn negotiated_split_must_balance_before_review() {
        let mut state = sample_state();
        let mut task = sample_task(1, Rule::Negotiated); // base 6
        task.participants = vec!["ana".into(), "bruno".into()];
        task.distribution.insert("ana".into(), 4);
        state.buildings[0].tasks.push(task);

        let err = move_task(&mut state, B, 1, Status::Review).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(state.buildings[0].tasks[0].status, Status::Backlog);

        state.buildings[0].tasks[0].distribution.insert("bruno".into(), 2);
        move_task(&mut state, B, 1, Status::Review).unwrap();
    }

    #[test]
    fn missing_ids_are_reported() {
        let mut state = sample_state();
        let err = settle(&mut state, 9, 1, Rating::Basic, None, "vera", 0).unwrap_err();
        assert_eq!(err, EngineError::BuildingNotFound(9));
        let err = move_task(&mut state, B, 42, Status::Doing).unwrap_err();
        assert_eq!(err, EngineError::TaskNotFound(42));
    }

    #[test]
    fn settlement_counter_always_matches_audit_history() {
        let mut state = sample_state();
        push_review_task(&mut state, 1, Rule::Integrated);
        let mut fixed = sample_task(2, Rule::Fixed {
            limiter: FixedLimiter::Quantity { limit: 2, count: 0 },
        });
        fixed.status = Status::Review;
        state.buildings[0].tasks.push(fixed);

        settle(&mut state, B, 1, Rating::Outstanding, None, "vera", 1).unwrap();
        settle(&mut state, B, 2, Rating::Basic, None, "vera", 2).unwrap();
        move_task(&mut state, B, 2, Status::Review).unwrap();
        settle(&mut state, B, 2, Rating::Relevant, None, "vera", 3).unwrap();

        let building = &state.buildings[0];
        assert_eq!(building.settled_points, building.history_points());
        // 6×2 + 6×1 + 6×1.5 = 27
        assert_eq!(building.settled_points, 27);
    }
}
