//! Command-line surface for the `ralph` binary.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ralph",
    version,
    about = "Autonomous-loop orchestrator: keeps an AI coding assistant iterating under time and iteration budgets"
)]
pub struct Cli {
    /// Project root (defaults to the current directory, or the hook
    /// payload's cwd for hook commands).
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the loop in this project.
    Start {
        #[arg(long, value_enum, default_value_t = Preset::Production)]
        preset: Preset,

        /// Focus file(s) the agent should drive toward; repeatable.
        #[arg(long)]
        focus: Vec<String>,

        /// Start in exploration with no focus file.
        #[arg(long)]
        no_focus: bool,
    },

    /// Stop the loop. The current tick finishes; the next one finalizes.
    Stop {
        /// Stop every Ralph loop on this machine, not just this project.
        #[arg(long)]
        global: bool,
    },

    /// Show loop state, session progress, and the last stop reason.
    Status,

    /// Add (or remove) an encouraged activity.
    Encourage {
        text: String,

        #[arg(long)]
        remove: bool,
    },

    /// Add (or remove) a forbidden activity.
    Forbid {
        text: String,

        #[arg(long)]
        remove: bool,
    },

    /// Acknowledge a preflight constraint: hides it from future prompts
    /// and pushes its recommendation into the forbidden list.
    AckConstraint { id: String },

    /// Host hook entry points (stdin JSON in, stdout JSON out).
    #[command(subcommand)]
    Hook(HookCommands),
}

#[derive(Subcommand)]
pub enum HookCommands {
    /// Stop-hook tick: decide whether the assistant may stop.
    Stop,

    /// PreToolUse guard: veto destructive commands against loop files.
    PreTool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Ten-minute cap, 10..20 iterations; for trying the loop out.
    Poc,
    /// Multi-hour budget for real unattended runs.
    Production,
}
