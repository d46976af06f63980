//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers, from roster and building
//! management through the task lifecycle to settlement, renewal and the
//! kanban board TUI.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{Duration, Local, NaiveDate, Utc};

use crate::building::{self, Building, Scope};
use crate::error::EngineError;
use crate::fields::{BuildingType, FixedPeriod, Rating, Role, RuleKind, Status};
use crate::player::SquadStats;
use crate::scoring;
use crate::settlement;
use crate::state::{slugify, GameState, Squad, User};
use crate::task::{FixedLimiter, Rule, Task};
use crate::tui::board::run_board;

/// Default squad marker colors, assigned round-robin.
const SQUAD_COLORS: [&str; 10] = [
    "#ef4444", "#f97316", "#f59e0b", "#84cc16", "#10b981", "#06b6d4", "#3b82f6",
    "#6366f1", "#d946ef", "#f43f5e",
];

#[derive(Subcommand)]
pub enum Commands {
    /// Launch the kanban board interface.
    Board {
        /// Scope the board to one building instead of the whole city.
        #[arg(long)]
        building: Option<u64>,
    },

    /// Add a new task to a building's board.
    Add {
        /// Short title for the task.
        title: String,
        /// Building the task belongs to.
        #[arg(long)]
        building: u64,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Task size from the Fibonacci scale: 1 2 3 5 8 13 21 34 55.
        #[arg(long, default_value_t = 1)]
        size: u32,
        /// Complexity: 1 (simple) | 2 (moderate) | 3 (complex).
        #[arg(long, default_value_t = 1)]
        complexity: u32,
        /// Collaboration rule: integrated | negotiated | fixed.
        #[arg(long, value_enum, default_value_t = RuleKind::Integrated)]
        rule: RuleKind,
        /// Participant user ID. May be repeated; defaults to the creator.
        #[arg(long = "participant")]
        participants: Vec<String>,
        /// Assignee user ID.
        #[arg(long)]
        assignee: Option<String>,
        /// Cycle quota for fixed tasks (mutually exclusive with --deadline).
        #[arg(long)]
        quantity_limit: Option<u32>,
        /// Deadline for fixed tasks: YYYY-MM-DD, "today", "tomorrow" or "in Nd".
        #[arg(long)]
        deadline: Option<String>,
        /// Recurrence period tag for deadline-limited fixed tasks.
        #[arg(long, value_enum)]
        period: Option<FixedPeriod>,
    },

    /// Update fields on a task.
    Update {
        /// Task ID to update.
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        complexity: Option<u32>,
        /// Add a participant. May be repeated.
        #[arg(long = "add-participant")]
        add_participants: Vec<String>,
        /// Remove a participant. May be repeated.
        #[arg(long = "rm-participant")]
        rm_participants: Vec<String>,
        /// Negotiated share as user=points. May be repeated.
        #[arg(long = "share")]
        shares: Vec<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        evidence_link: Option<String>,
        #[arg(long)]
        delivery_notes: Option<String>,
        #[arg(long)]
        reflections: Option<String>,
    },

    /// List tasks with optional filters.
    List {
        /// Filter by building ID.
        #[arg(long)]
        building: Option<u64>,
        /// Filter by squad ID.
        #[arg(long)]
        squad: Option<String>,
        /// Filter by participating/creating user ID.
        #[arg(long)]
        user: Option<String>,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Include done tasks.
        #[arg(long)]
        all: bool,
    },

    /// View a single task with its history.
    View {
        /// Task ID to view.
        id: u64,
    },

    /// Move a task to another kanban column.
    Move {
        /// Task ID to move.
        id: u64,
        /// Target column.
        #[arg(value_enum)]
        status: Status,
    },

    /// Show the point estimate for a task.
    Estimate {
        /// Task ID to estimate.
        id: u64,
    },

    /// Grade a review task and distribute rewards (masters only).
    Settle {
        /// Task ID to grade.
        id: u64,
        /// Rating: 0 (null) | 1 (basic) | 2 (relevant) | 3 (outstanding).
        #[arg(long)]
        rating: u8,
        /// Feedback text recorded with the settlement.
        #[arg(long)]
        feedback: Option<String>,
    },

    /// Resolve a pending renewal on a recurring task (masters only).
    Renew {
        /// Task ID awaiting a renewal decision.
        id: u64,
        /// Renew the task: back to the backlog for a fresh cycle.
        #[arg(long)]
        accept: bool,
        /// Close the task permanently.
        #[arg(long)]
        decline: bool,
    },

    /// List buildings with capacity usage.
    Buildings,

    /// Construct a new building (construction is free).
    Build {
        /// Display name for the building.
        name: String,
        /// Building kind.
        #[arg(long, value_enum, default_value_t = BuildingType::Product)]
        kind: BuildingType,
        /// Squad the building belongs to.
        #[arg(long)]
        squad: Option<String>,
        /// Owner user ID; defaults to the acting user.
        #[arg(long)]
        owner: Option<String>,
    },

    /// Upgrade a building one level, paying coins from your wallet.
    Upgrade {
        /// Building ID to upgrade.
        id: u64,
    },

    /// Demolish a building that has no settled history.
    Demolish {
        /// Building ID to demolish.
        id: u64,
    },

    /// Planned/concluded point totals for a building, squad or user scope.
    Stats {
        /// Building scope.
        #[arg(long)]
        building: Option<u64>,
        /// Squad scope (rolls up every building of the squad).
        #[arg(long)]
        squad: Option<String>,
        /// User scope (every task the user created or participates in).
        #[arg(long)]
        user: Option<String>,
    },

    /// Show a player's level, XP, points, coins and reputation.
    Player {
        /// User ID; defaults to the acting user.
        user: Option<String>,
    },

    /// List squads.
    Squads,

    /// Add a squad to the roster.
    AddSquad {
        /// Display name for the squad.
        name: String,
        /// Marker color (hex); defaults to the next palette color.
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        desc: Option<String>,
    },

    /// List roster users.
    Users,

    /// Add a user to the roster.
    AddUser {
        /// Display name for the user.
        name: String,
        /// Squad the user belongs to.
        #[arg(long)]
        squad: String,
        /// Role: master | mentor | executor.
        #[arg(long, value_enum, default_value_t = Role::Executor)]
        role: Role,
    },

    /// Show the sprint cycle, or advance to the next sprint.
    Sprint {
        /// Start the next sprint now.
        #[arg(long)]
        advance: bool,
    },

    /// Create a timestamped backup of the state file.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Launch the kanban board interface.
pub fn cmd_board(state_path: &Path, building: Option<u64>, acting_user: Option<String>) {
    if let Err(e) = run_board(state_path, building, acting_user) {
        eprintln!("Board error: {e}");
        std::process::exit(1);
    }
}

/// Add a new task to a building.
pub fn cmd_add(
    state: &mut GameState,
    path: &Path,
    acting_user: Option<String>,
    title: String,
    building_id: u64,
    desc: Option<String>,
    size: u32,
    complexity: u32,
    rule_kind: RuleKind,
    participants: Vec<String>,
    assignee: Option<String>,
    quantity_limit: Option<u32>,
    deadline: Option<String>,
    period: Option<FixedPeriod>,
) {
    let creator = require_user(state, acting_user);

    if !scoring::is_valid_size(size) {
        eprintln!(
            "Invalid size {size}; allowed sizes: {:?}",
            scoring::FIBONACCI_SIZES
        );
        std::process::exit(1);
    }
    if !scoring::is_valid_complexity(complexity) {
        eprintln!("Invalid complexity {complexity}; allowed: 1, 2, 3");
        std::process::exit(1);
    }

    let Some(building) = state.building(building_id) else {
        eprintln!("Building #{building_id} not found");
        std::process::exit(1);
    };
    if matches!(
        building.kind,
        BuildingType::SquadHq | BuildingType::Residential | BuildingType::Decoration
    ) {
        eprintln!(
            "{} is an aggregate/decorative building; pick a functional project building",
            building.name
        );
        std::process::exit(1);
    }

    let squad = building
        .squad
        .clone()
        .or_else(|| state.user(&creator).map(|u| u.squad.clone()))
        .unwrap_or_default();

    let rule = match rule_kind {
        RuleKind::Integrated => Rule::Integrated,
        RuleKind::Negotiated => Rule::Negotiated,
        RuleKind::Fixed => match (quantity_limit, deadline) {
            (Some(limit), None) => Rule::Fixed {
                limiter: FixedLimiter::Quantity { limit, count: 0 },
            },
            (None, Some(spec)) => {
                let Some(deadline_utc) = parse_deadline_input(&spec) else {
                    eprintln!("Could not parse deadline '{spec}'");
                    std::process::exit(1);
                };
                Rule::Fixed {
                    limiter: FixedLimiter::Deadline {
                        deadline_utc,
                        period: period.unwrap_or(FixedPeriod::Custom),
                    },
                }
            }
            _ => {
                eprintln!("Fixed tasks need exactly one of --quantity-limit or --deadline");
                std::process::exit(1);
            }
        },
    };

    let mut task_participants = if participants.is_empty() {
        vec![creator.clone()]
    } else {
        participants
    };
    task_participants.dedup();
    for p in &task_participants {
        if state.user(p).is_none() {
            eprintln!("Participant '{p}' is not in the roster");
            std::process::exit(1);
        }
    }
    if let Some(a) = &assignee {
        if state.user(a).is_none() {
            eprintln!("Assignee '{a}' is not in the roster");
            std::process::exit(1);
        }
    }

    let id = state.next_task_id();
    let task = Task {
        id,
        title,
        description: desc,
        status: Status::Backlog,
        creator,
        assignee,
        squad,
        size,
        complexity,
        rule_multiplier: 1.0,
        rule,
        participants: task_participants,
        distribution: BTreeMap::new(),
        evidence_link: None,
        delivery_notes: None,
        reflections: None,
        settlement: None,
        pending_renewal: None,
        history: Vec::new(),
        sprint_history: Vec::new(),
        created_at_utc: Utc::now().timestamp(),
    };
    let estimate = scoring::estimate_points(&task);

    if let Some(b) = state.building_mut(building_id) {
        b.tasks.push(task);
    }
    save_or_exit(state, path);
    println!("Added task #{id} ({estimate} pts) to building #{building_id}");
}

/// Update fields on a task.
pub fn cmd_update(
    state: &mut GameState,
    path: &Path,
    id: u64,
    title: Option<String>,
    desc: Option<String>,
    size: Option<u32>,
    complexity: Option<u32>,
    add_participants: Vec<String>,
    rm_participants: Vec<String>,
    shares: Vec<String>,
    assignee: Option<String>,
    evidence_link: Option<String>,
    delivery_notes: Option<String>,
    reflections: Option<String>,
) {
    let Some((building_id, task)) = state.locate_task(id) else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };
    if task.is_permanently_done() || task.pending_renewal.is_some() {
        eprintln!("Task #{id} is settled; its record can no longer be edited");
        std::process::exit(1);
    }

    if let Some(s) = size {
        if !scoring::is_valid_size(s) {
            eprintln!(
                "Invalid size {s}; allowed sizes: {:?}",
                scoring::FIBONACCI_SIZES
            );
            std::process::exit(1);
        }
    }
    if let Some(c) = complexity {
        if !scoring::is_valid_complexity(c) {
            eprintln!("Invalid complexity {c}; allowed: 1, 2, 3");
            std::process::exit(1);
        }
    }
    for p in add_participants.iter().chain(assignee.iter()) {
        if state.user(p).is_none() {
            eprintln!("User '{p}' is not in the roster");
            std::process::exit(1);
        }
    }
    let parsed_shares: Vec<(String, u64)> = shares
        .iter()
        .map(|spec| match parse_share(spec) {
            Some(pair) => pair,
            None => {
                eprintln!("Invalid share '{spec}'; expected user=points");
                std::process::exit(1);
            }
        })
        .collect();
    for (user, _) in &parsed_shares {
        if state.user(user).is_none() {
            eprintln!("User '{user}' is not in the roster");
            std::process::exit(1);
        }
    }

    let found = state
        .building_mut(building_id)
        .and_then(|b| b.get_task_mut(id));
    let Some(task) = found else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };

    if let Some(t) = title {
        task.title = t;
    }
    if desc.is_some() {
        task.description = desc;
    }
    if let Some(s) = size {
        task.size = s;
    }
    if let Some(c) = complexity {
        task.complexity = c;
    }
    for p in add_participants {
        if !task.participants.contains(&p) {
            task.participants.push(p);
        }
    }
    task.participants.retain(|p| !rm_participants.contains(p));
    for (user, points) in parsed_shares {
        task.distribution.insert(user, points);
    }
    if assignee.is_some() {
        task.assignee = assignee;
    }
    if evidence_link.is_some() {
        task.evidence_link = evidence_link;
    }
    if delivery_notes.is_some() {
        task.delivery_notes = delivery_notes;
    }
    if reflections.is_some() {
        task.reflections = reflections;
    }

    save_or_exit(state, path);
    println!("Updated task #{id}");
}

/// List tasks with optional filters.
pub fn cmd_list(
    state: &GameState,
    building: Option<u64>,
    squad: Option<String>,
    user: Option<String>,
    status: Option<Status>,
    all: bool,
) {
    let mut rows: Vec<(u64, &Task)> = Vec::new();
    for b in &state.buildings {
        if let Some(id) = building {
            if b.id != id {
                continue;
            }
        }
        for t in &b.tasks {
            if let Some(sq) = &squad {
                if &t.squad != sq {
                    continue;
                }
            }
            if let Some(u) = &user {
                if &t.creator != u && !t.participants.iter().any(|p| p == u) {
                    continue;
                }
            }
            if let Some(s) = status {
                if t.status != s {
                    continue;
                }
            } else if !all && t.status == Status::Done {
                continue;
            }
            rows.push((b.id, t));
        }
    }

    println!(
        "{:<5} {:<9} {:<15} {:>4} {:>3} {:>5} {:<5} {}",
        "ID", "Status", "Rule", "Size", "Cx", "Pts", "Bldg", "Title"
    );
    for (building_id, t) in rows {
        println!(
            "{:<5} {:<9} {:<15} {:>4} {:>3} {:>5} {:<5} {}",
            t.id,
            t.status.label(),
            t.rule.kind().label(),
            t.size,
            t.complexity,
            scoring::estimate_points(t),
            building_id,
            t.title
        );
    }
}

/// View a single task in detail.
pub fn cmd_view(state: &GameState, id: u64) {
    let Some((building_id, task)) = state.locate_task(id) else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };

    println!("Task #{}: {}", task.id, task.title);
    println!("  Status:       {}", task.status.label());
    println!("  Building:     #{building_id}");
    println!("  Squad:        {}", task.squad);
    println!("  Creator:      {}", task.creator);
    println!("  Assignee:     {}", task.assignee.as_deref().unwrap_or("-"));
    println!("  Rule:         {}", task.rule.kind().label());
    println!(
        "  Size/Cx:      {} x {} = {} pts",
        task.size,
        task.complexity,
        scoring::base_points(task.size, task.complexity, task.rule_multiplier)
    );
    if let Rule::Fixed { limiter } = &task.rule {
        match limiter {
            FixedLimiter::Quantity { limit, count } => {
                println!("  Cycles:       {count}/{limit}");
            }
            FixedLimiter::Deadline { deadline_utc, period } => {
                println!(
                    "  Deadline:     {} ({:?})",
                    format_timestamp(*deadline_utc),
                    period
                );
            }
        }
    }
    if !task.distribution.is_empty() {
        let split: Vec<String> = task
            .distribution
            .iter()
            .map(|(u, p)| format!("{u}={p}"))
            .collect();
        println!("  Split:        {}", split.join(", "));
    }
    println!("  Participants: {}", task.participants_or_creator().join(", "));
    if let Some(d) = &task.description {
        println!("  Description:  {d}");
    }
    if let Some(link) = &task.evidence_link {
        println!("  Evidence:     {link}");
    }
    if !task.sprint_history.is_empty() {
        println!("  Sprints:      {}", task.sprint_history.join(", "));
    }
    if let Some(renewal) = &task.pending_renewal {
        println!("  Renewal:      awaiting decision ({renewal:?} limit reached)");
    }
    if let Some(s) = &task.settlement {
        println!(
            "  Settled:      rating {} -> {} pts, {} XP, {} coins",
            s.rating, s.final_points, s.final_xp, s.final_coins
        );
        if let Some(f) = &s.feedback {
            println!("  Feedback:     {f}");
        }
    }
    if !task.history.is_empty() {
        println!("  History:");
        for h in &task.history {
            println!(
                "    {}  sprint {}  rating {}  {} pts  [{}]",
                format_timestamp(h.timestamp_utc),
                h.sprint,
                h.rating,
                h.points,
                h.participants.join(", ")
            );
        }
    }
}

/// Move a task to another kanban column.
pub fn cmd_move(state: &mut GameState, path: &Path, id: u64, status: Status) {
    let Some((building_id, _)) = state.locate_task(id) else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };
    match settlement::move_task(state, building_id, id, status) {
        Ok(()) => {
            save_or_exit(state, path);
            println!("Task #{id} -> {}", status.label());
        }
        Err(e) => report_engine_error(e),
    }
}

/// Show the point estimate for a task.
pub fn cmd_estimate(state: &GameState, id: u64) {
    let Some((_, task)) = state.locate_task(id) else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };
    println!("{}", scoring::estimate_points(task));
}

/// Grade a review task and distribute rewards.
pub fn cmd_settle(
    state: &mut GameState,
    path: &Path,
    acting_user: Option<String>,
    id: u64,
    rating: u8,
    feedback: Option<String>,
) {
    let actor = require_user(state, acting_user);
    let Some(rating) = Rating::from_value(rating) else {
        eprintln!("Rating must be 0, 1, 2 or 3");
        std::process::exit(1);
    };
    let Some((building_id, _)) = state.locate_task(id) else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };

    let now = Utc::now().timestamp();
    match settlement::settle(state, building_id, id, rating, feedback, &actor, now) {
        Ok(outcome) => {
            save_or_exit(state, path);
            println!(
                "Settled task #{id}: rating {} ({}) -> {} pts, {} XP, {} coins",
                outcome.rating,
                rating.label(),
                outcome.task_points,
                outcome.task_xp,
                outcome.task_coins
            );
            for (user, points) in &outcome.shares {
                println!("  {user}: +{points} pts");
            }
            match outcome.next_status {
                Status::Backlog => println!("Cycle complete; task returned to the backlog."),
                Status::Done if outcome.renewal_pending.is_some() => {
                    println!(
                        "Renewal limit reached. Decide with: cb renew {id} --accept | --decline"
                    );
                }
                _ => {}
            }
        }
        Err(e) => report_engine_error(e),
    }
}

/// Resolve a pending renewal decision.
pub fn cmd_renew(
    state: &mut GameState,
    path: &Path,
    acting_user: Option<String>,
    id: u64,
    accept: bool,
    decline: bool,
) {
    if accept == decline {
        eprintln!("Pass exactly one of --accept or --decline");
        std::process::exit(1);
    }
    let actor = require_user(state, acting_user);
    let Some((building_id, _)) = state.locate_task(id) else {
        eprintln!("Task #{id} not found");
        std::process::exit(1);
    };

    let now = Utc::now().timestamp();
    match settlement::resolve_renewal(state, building_id, id, accept, &actor, now) {
        Ok(Status::Backlog) => {
            save_or_exit(state, path);
            println!("Task #{id} renewed and returned to the backlog.");
        }
        Ok(_) => {
            save_or_exit(state, path);
            println!("Task #{id} closed permanently.");
        }
        Err(e) => report_engine_error(e),
    }
}

/// List buildings with capacity usage.
pub fn cmd_buildings(state: &GameState) {
    println!(
        "{:<5} {:<18} {:<18} {:>5} {:>8} {:>9} {:>9}",
        "ID", "Name", "Kind", "Lvl", "Tasks", "Settled", "Capacity"
    );
    for b in &state.buildings {
        println!(
            "{:<5} {:<18} {:<18} {:>5} {:>8} {:>9} {:>9}",
            b.id,
            truncate(&b.name, 18),
            b.kind.label(),
            b.level,
            b.tasks.len(),
            b.settled_points,
            b.capacity()
        );
    }
}

/// Construct a new building.
pub fn cmd_build(
    state: &mut GameState,
    path: &Path,
    acting_user: Option<String>,
    name: String,
    kind: BuildingType,
    squad: Option<String>,
    owner: Option<String>,
) {
    let actor = require_user(state, acting_user);
    if let Some(sq) = &squad {
        if state.squad(sq).is_none() {
            eprintln!("Squad '{sq}' is not in the roster");
            std::process::exit(1);
        }
    }
    let owner = owner.unwrap_or(actor);
    if state.user(&owner).is_none() {
        eprintln!("Owner '{owner}' is not in the roster");
        std::process::exit(1);
    }

    let id = state.next_building_id();
    state.buildings.push(Building {
        id,
        name: name.clone(),
        kind,
        level: 1,
        owner: Some(owner),
        squad,
        settled_points: 0,
        tasks: Vec::new(),
        created_at_utc: Utc::now().timestamp(),
    });
    save_or_exit(state, path);
    println!(
        "Constructed {} '{}' (#{id}, level 1, capacity {})",
        kind.label(),
        name,
        scoring::capacity_for_level(1)
    );
}

/// Upgrade a building one level, paying from the acting user's wallet.
pub fn cmd_upgrade(state: &mut GameState, path: &Path, acting_user: Option<String>, id: u64) {
    let actor = require_user(state, acting_user);
    let Some(building) = state.building(id) else {
        eprintln!("Building #{id} not found");
        std::process::exit(1);
    };
    let level = building.level;
    let cost = scoring::upgrade_cost(level);

    let profile = state.profile_mut(&actor);
    if !profile.try_spend(cost) {
        let have = profile.coins;
        report_engine_error(EngineError::InsufficientCoins { have, need: cost });
    }
    if let Some(b) = state.building_mut(id) {
        b.level += 1;
    }
    save_or_exit(state, path);
    let capacity = scoring::capacity_for_level(level + 1);
    println!("Upgraded building #{id} to level {} for {cost} coins (capacity {capacity})",
        level + 1);
}

/// Demolish a building that has no settled history.
pub fn cmd_demolish(state: &mut GameState, path: &Path, id: u64) {
    let Some(building) = state.building(id) else {
        eprintln!("Building #{id} not found");
        std::process::exit(1);
    };
    if building.settled_points > 0 || building.history_points() > 0 {
        eprintln!(
            "Building #{id} holds settled history ({} pts); demolition would lose it",
            building.settled_points
        );
        std::process::exit(1);
    }
    let name = building.name.clone();
    state.buildings.retain(|b| b.id != id);
    save_or_exit(state, path);
    println!("Demolished '{name}' (#{id})");
}

/// Planned/concluded totals for the chosen scope.
pub fn cmd_stats(
    state: &GameState,
    building: Option<u64>,
    squad: Option<String>,
    user: Option<String>,
) {
    match (building, squad, user) {
        (Some(id), None, None) => {
            let Some(b) = state.building(id) else {
                eprintln!("Building #{id} not found");
                std::process::exit(1);
            };
            let scope = Scope::Building(id);
            println!("Building #{}: {} (level {})", b.id, b.name, b.level);
            println!("  Planned:   {} pts", building::planned_points(state, &scope));
            println!(
                "  Concluded: {} / {} pts capacity ({} free)",
                building::concluded_points(state, &scope),
                b.capacity(),
                b.remaining_capacity()
            );
        }
        (None, Some(sq), None) => {
            if state.squad(&sq).is_none() {
                eprintln!("Squad '{sq}' is not in the roster");
                std::process::exit(1);
            }
            let stats = SquadStats::derive(state, &sq);
            println!("Squad '{sq}'");
            println!("  Planned:   {} pts", stats.planned_points);
            println!("  Concluded: {} pts", stats.concluded_points);
            println!(
                "  Level {} ({} / {} XP into level, {} XP lifetime)",
                stats.level, stats.xp_into_level, stats.next_level_xp, stats.total_xp
            );
            println!(
                "  Average rating: {:.2} over {} settled cycles",
                stats.average_rating, stats.settled_cycles
            );
        }
        (None, None, Some(u)) => {
            if state.user(&u).is_none() {
                eprintln!("User '{u}' is not in the roster");
                std::process::exit(1);
            }
            let scope = Scope::User(u.clone());
            println!("User '{u}'");
            println!("  Planned:   {} pts", building::planned_points(state, &scope));
            println!("  Concluded: {} pts", building::concluded_points(state, &scope));
        }
        _ => {
            eprintln!("Pass exactly one of --building, --squad or --user");
            std::process::exit(1);
        }
    }
}

/// Show a player's profile.
pub fn cmd_player(state: &GameState, acting_user: Option<String>, user: Option<String>) {
    let id = match user {
        Some(u) => u,
        None => require_user(state, acting_user),
    };
    if state.user(&id).is_none() {
        eprintln!("User '{id}' is not in the roster");
        std::process::exit(1);
    }
    let default_profile = crate::player::PlayerProfile::default();
    let profile = state.players.get(&id).unwrap_or(&default_profile);
    println!("Player '{id}'");
    println!(
        "  Level {} ({} / {} XP)",
        profile.level, profile.current_xp, profile.next_level_xp
    );
    println!("  Points: {}", profile.total_points);
    println!("  Coins:  {}", profile.coins);
    println!(
        "  Reputation: {:.2} ({})",
        profile.reputation,
        "*".repeat(profile.reputation_stars() as usize)
    );
}

/// List squads.
pub fn cmd_squads(state: &GameState) {
    println!("{:<14} {:<18} {:<9} {}", "ID", "Name", "Color", "Members");
    for s in &state.squads {
        let members = state.users.iter().filter(|u| u.squad == s.id).count();
        println!("{:<14} {:<18} {:<9} {}", s.id, truncate(&s.name, 18), s.color, members);
    }
}

/// Add a squad to the roster.
pub fn cmd_add_squad(
    state: &mut GameState,
    path: &Path,
    name: String,
    color: Option<String>,
    desc: Option<String>,
) {
    let id = slugify(&name);
    if id.is_empty() {
        eprintln!("Squad name cannot be empty");
        std::process::exit(1);
    }
    if state.squad(&id).is_some() {
        eprintln!("Squad '{id}' already exists");
        std::process::exit(1);
    }
    let color =
        color.unwrap_or_else(|| SQUAD_COLORS[state.squads.len() % SQUAD_COLORS.len()].to_string());
    state.squads.push(Squad {
        id: id.clone(),
        name,
        color,
        description: desc,
    });
    save_or_exit(state, path);
    println!("Added squad '{id}'");
}

/// List roster users.
pub fn cmd_users(state: &GameState) {
    println!("{:<14} {:<18} {:<14} {}", "ID", "Name", "Squad", "Role");
    for u in &state.users {
        println!(
            "{:<14} {:<18} {:<14} {}",
            u.id,
            truncate(&u.name, 18),
            u.squad,
            u.role.label()
        );
    }
}

/// Add a user to the roster.
pub fn cmd_add_user(state: &mut GameState, path: &Path, name: String, squad: String, role: Role) {
    let id = slugify(&name);
    if id.is_empty() {
        eprintln!("User name cannot be empty");
        std::process::exit(1);
    }
    if state.user(&id).is_some() {
        eprintln!("User '{id}' already exists");
        std::process::exit(1);
    }
    if state.squad(&squad).is_none() {
        eprintln!("Squad '{squad}' is not in the roster");
        std::process::exit(1);
    }
    state.users.push(User {
        id: id.clone(),
        name,
        squad,
        role,
    });
    state.profile_mut(&id);
    save_or_exit(state, path);
    println!("Added user '{id}' ({})", role.label());
}

/// Show the sprint cycle, or advance it.
pub fn cmd_sprint(state: &mut GameState, path: &Path, advance: bool) {
    let now = Utc::now().timestamp();
    if advance {
        state.advance_sprint(now);
        save_or_exit(state, path);
        println!("Started {}", state.sprint_label());
    } else {
        println!(
            "{}: {} day(s) remaining",
            state.sprint_label(),
            state.sprint_days_remaining(now)
        );
    }
}

/// Create a timestamped backup of the state file.
pub fn cmd_backup(state_path: &Path) {
    match create_backup(state_path) {
        Ok(backup_path) => println!("Backup created: {backup_path}"),
        Err(e) => {
            eprintln!("Failed to create backup: {e}");
            std::process::exit(1);
        }
    }
}

pub fn create_backup(state_path: &Path) -> Result<String, std::io::Error> {
    if !state_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "State file does not exist",
        ));
    }

    let parent_dir = state_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let file_name = state_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("state.json");
    let backup_path = backup_dir.join(format!("{timestamp}_{file_name}"));
    fs::copy(state_path, &backup_path)?;

    Ok(backup_path.to_string_lossy().to_string())
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;

    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// Resolve the acting user: the --user flag, or the roster's only member.
fn require_user(state: &GameState, acting_user: Option<String>) -> String {
    match acting_user {
        Some(id) => {
            if state.user(&id).is_none() {
                eprintln!("User '{id}' is not in the roster");
                std::process::exit(1);
            }
            id
        }
        None => {
            if state.users.len() == 1 {
                state.users[0].id.clone()
            } else {
                eprintln!("Pass --user <id> to choose the acting user");
                std::process::exit(1);
            }
        }
    }
}

fn report_engine_error(e: EngineError) -> ! {
    eprintln!("{e}");
    std::process::exit(1);
}

fn save_or_exit(state: &GameState, path: &Path) {
    if let Err(e) = state.save(path) {
        eprintln!("Failed to save state: {e}");
        std::process::exit(1);
    }
}

/// Parse a share spec of the form `user=points`.
fn parse_share(spec: &str) -> Option<(String, u64)> {
    let (user, points) = spec.split_once('=')?;
    let user = user.trim();
    if user.is_empty() {
        return None;
    }
    Some((user.to_string(), points.trim().parse().ok()?))
}

/// Parse a deadline: "today", "tomorrow", "in Nd", "in Nw" or YYYY-MM-DD.
/// Returns an end-of-day UTC timestamp.
fn parse_deadline_input(s: &str) -> Option<i64> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    let date = match s.as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        _ => {
            if let Some(rest) = s.strip_prefix("in ") {
                if let Some(nd) = rest.strip_suffix('d') {
                    nd.trim().parse::<i64>().ok().map(|d| today + Duration::days(d))
                } else if let Some(nw) = rest.strip_suffix('w') {
                    nw.trim().parse::<i64>().ok().map(|w| today + Duration::weeks(w))
                } else {
                    None
                }
            } else {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
            }
        }
    };

    date.and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc().timestamp())
}

fn format_timestamp(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => ts.to_string(),
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_specs_parse() {
        assert_eq!(parse_share("ana=12"), Some(("ana".into(), 12)));
        assert_eq!(parse_share(" bruno = 3 "), Some(("bruno".into(), 3)));
        assert_eq!(parse_share("ana"), None);
        assert_eq!(parse_share("=3"), None);
        assert_eq!(parse_share("ana=lots"), None);
    }

    #[test]
    fn deadline_inputs_parse() {
        assert!(parse_deadline_input("today").is_some());
        assert!(parse_deadline_input("in 3d").is_some());
        assert!(parse_deadline_input("in 2w").is_some());
        assert!(parse_deadline_input("2031-05-01").is_some());
        assert!(parse_deadline_input("whenever").is_none());
    }
}
