use anyhow::Result;
use clap::Parser;

mod cli;
mod hook_cmds;
mod loop_cmds;

use cli::{Cli, Commands, HookCommands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hook commands own their logging (project log file, clean stdout);
    // management commands log to stderr like any CLI.
    if let Commands::Hook(hook) = &cli.command {
        let code = match hook {
            HookCommands::Stop => hook_cmds::run_stop_hook(cli.project.clone())?,
            HookCommands::PreTool => hook_cmds::run_pretool_hook(cli.project.clone())?,
        };
        std::process::exit(code);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let project_root = match &cli.project {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    let home_claude = ralph_config::paths::home_claude_dir()?;

    match cli.command {
        Commands::Start { preset, focus, no_focus } => {
            loop_cmds::handle_start(&project_root, &home_claude, preset, focus, no_focus)
        }
        Commands::Stop { global } => loop_cmds::handle_stop(&project_root, &home_claude, global),
        Commands::Status => loop_cmds::handle_status(&project_root, &home_claude),
        Commands::Encourage { text, remove } => {
            loop_cmds::handle_encourage(&project_root, &text, remove)
        }
        Commands::Forbid { text, remove } => {
            loop_cmds::handle_forbid(&project_root, &text, remove)
        }
        Commands::AckConstraint { id } => loop_cmds::handle_ack_constraint(&project_root, &id),
        Commands::Hook(_) => unreachable!("handled above"),
    }
}
