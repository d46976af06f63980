use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Gamified, file-backed team task manager CLI.
/// Storage defaults to ~/.cityboard/state.json or a path passed via --state.
#[derive(Parser)]
#[command(name = "cb", version, about = "Gamified team task management CLI")]
pub struct Cli {
    /// Path to the JSON state file.
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// Acting user ID (defaults to the roster's only member).
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}
