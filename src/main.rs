//! # CB - Cityboard CLI
//!
//! A gamified team task manager: squads run kanban boards inside city
//! buildings, and finished work is graded into points, coins and XP.
//!
//! ## Key Features
//!
//! - **Kanban Lifecycle**: six-column board (Backlog → To Do → Doing →
//!   Blocked → Review → Done) with free-form moves and sprint stamping
//! - **Point Settlement**: supervisors grade review tasks; ratings scale the
//!   Fibonacci-sized point value into per-participant points, coins and XP
//! - **Collaboration Rules**: integrated (full credit to all), negotiated
//!   (agreed split) and fixed (recurring with quantity or deadline limits)
//! - **Buildings**: each board lives in a building whose level caps how many
//!   settled points it can hold; upgrades are paid from coin wallets
//! - **Progression**: player levels with geometric XP thresholds, reputation
//!   as a decaying average of ratings, derived squad leveling
//! - **Multiple Interfaces**: full CLI for automation + a kanban board TUI
//!
//! ## Quick Start
//!
//! ```bash
//! # Set up a roster
//! cb add-squad "Atlas"
//! cb add-user "Vera" --squad atlas --role master
//! cb add-user "Ana" --squad atlas
//!
//! # Construct a building and add work
//! cb build "Launch Hub" --squad atlas --user vera
//! cb add "Ship onboarding flow" --building 1 --size 5 --complexity 2 --user ana
//!
//! # Work it across the board, then grade it
//! cb move 1 review
//! cb settle 1 --rating 2 --feedback "solid delivery" --user vera
//!
//! # Or drive everything from the board TUI
//! cb board
//! ```
//!
//! Data is stored locally in `~/.cityboard/state.json`. We recommend you
//! source control this folder via `git init` and back it up periodically.

use std::path::PathBuf;

use clap::Parser;

pub mod building;
pub mod cli;
pub mod cmd;
pub mod error;
pub mod fields;
pub mod player;
pub mod scoring;
pub mod settlement;
pub mod state;
pub mod task;
pub mod tui {
    pub mod board;
    pub mod colors;
}

use cli::Cli;
use cmd::*;
use state::GameState;

fn main() {
    let cli = Cli::parse();

    // Determine the state file location.
    let state_path = cli.state.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let dir = PathBuf::from(home).join(".cityboard");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("Failed to create state directory {}: {}", dir.display(), e);
            std::process::exit(1);
        }
        dir.join("state.json")
    });

    // Commands that never load the state up front.
    match &cli.command {
        Commands::Board { building } => {
            cmd_board(&state_path, *building, cli.user);
            return;
        }
        Commands::Completions { shell } => {
            cmd_completions(*shell);
            return;
        }
        Commands::Backup => {
            cmd_backup(&state_path);
            return;
        }
        _ => {}
    }

    let mut state = GameState::load(&state_path);

    match cli.command {
        Commands::Board { .. } => unreachable!("Board command handled above"),
        Commands::Completions { .. } => unreachable!("Completions command handled above"),
        Commands::Backup => unreachable!("Backup command handled above"),

        Commands::Add {
            title, building, desc, size, complexity, rule, participants, assignee,
            quantity_limit, deadline, period,
        } => cmd_add(
            &mut state, &state_path, cli.user, title, building, desc, size, complexity,
            rule, participants, assignee, quantity_limit, deadline, period,
        ),

        Commands::Update {
            id, title, desc, size, complexity, add_participants, rm_participants,
            shares, assignee, evidence_link, delivery_notes, reflections,
        } => cmd_update(
            &mut state, &state_path, id, title, desc, size, complexity,
            add_participants, rm_participants, shares, assignee, evidence_link,
            delivery_notes, reflections,
        ),

        Commands::List { building, squad, user, status, all } =>
            cmd_list(&state, building, squad, user, status, all),

        Commands::View { id } => cmd_view(&state, id),

        Commands::Move { id, status } => cmd_move(&mut state, &state_path, id, status),

        Commands::Estimate { id } => cmd_estimate(&state, id),

        Commands::Settle { id, rating, feedback } =>
            cmd_settle(&mut state, &state_path, cli.user, id, rating, feedback),

        Commands::Renew { id, accept, decline } =>
            cmd_renew(&mut state, &state_path, cli.user, id, accept, decline),

        Commands::Buildings => cmd_buildings(&state),

        Commands::Build { name, kind, squad, owner } =>
            cmd_build(&mut state, &state_path, cli.user, name, kind, squad, owner),

        Commands::Upgrade { id } => cmd_upgrade(&mut state, &state_path, cli.user, id),

        Commands::Demolish { id } => cmd_demolish(&mut state, &state_path, id),

        Commands::Stats { building, squad, user } =>
            cmd_stats(&state, building, squad, user),

        Commands::Player { user } => cmd_player(&state, cli.user, user),

        Commands::Squads => cmd_squads(&state),

        Commands::AddSquad { name, color, desc } =>
            cmd_add_squad(&mut state, &state_path, name, color, desc),

        Commands::Users => cmd_users(&state),

        Commands::AddUser { name, squad, role } =>
            cmd_add_user(&mut state, &state_path, name, squad, role),

        Commands::Sprint { advance } => cmd_sprint(&mut state, &state_path, advance),
    }
}
