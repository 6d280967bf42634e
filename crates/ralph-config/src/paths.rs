//! On-disk layout for loop control files.
//!
//! Per project (relative to project root):
//! - `.claude/ralph-config.json`: config document
//! - `.claude/ralph-config.json.backup`: one-slot rollback
//! - `.claude/ralph-state.json`: state machine value
//! - `.claude/STOP_LOOP`: kill-switch sentinel
//! - `.claude/ralph-acknowledged-constraints.jsonl`: constraint ack log
//! - `.claude/ralph-sessions/`: session records
//! - `.claude/ralph.log`: engine log (append-only)
//!
//! Per user home:
//! - `~/.claude/ralph-global-stop.json`: process-wide stop signal
//! - `~/.claude/ralph-stop-reason.json`: last stop reason cache

use anyhow::Result;
use ralph_core::RalphError;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "ralph-config.json";
pub const STATE_FILE_NAME: &str = "ralph-state.json";
pub const KILL_SWITCH_FILE_NAME: &str = "STOP_LOOP";
pub const ACK_FILE_NAME: &str = "ralph-acknowledged-constraints.jsonl";
pub const SESSIONS_DIR_NAME: &str = "ralph-sessions";
pub const LOG_FILE_NAME: &str = "ralph.log";
pub const GLOBAL_STOP_FILE_NAME: &str = "ralph-global-stop.json";
pub const STOP_REASON_FILE_NAME: &str = "ralph-stop-reason.json";

/// `.claude/` directory for a project.
pub fn claude_dir(project_root: &Path) -> PathBuf {
    project_root.join(".claude")
}

pub fn config_path(project_root: &Path) -> PathBuf {
    claude_dir(project_root).join(CONFIG_FILE_NAME)
}

pub fn config_backup_path(project_root: &Path) -> PathBuf {
    let mut name = CONFIG_FILE_NAME.to_string();
    name.push_str(".backup");
    claude_dir(project_root).join(name)
}

pub fn state_path(project_root: &Path) -> PathBuf {
    claude_dir(project_root).join(STATE_FILE_NAME)
}

pub fn kill_switch_path(project_root: &Path) -> PathBuf {
    claude_dir(project_root).join(KILL_SWITCH_FILE_NAME)
}

pub fn ack_log_path(project_root: &Path) -> PathBuf {
    claude_dir(project_root).join(ACK_FILE_NAME)
}

pub fn sessions_dir(project_root: &Path) -> PathBuf {
    claude_dir(project_root).join(SESSIONS_DIR_NAME)
}

pub fn log_path(project_root: &Path) -> PathBuf {
    claude_dir(project_root).join(LOG_FILE_NAME)
}

/// `~/.claude/` for the current user.
///
/// Resolved via `directories`, falling back to `$HOME` for containers
/// without a known user directory layout.
pub fn home_claude_dir() -> Result<PathBuf> {
    if let Some(base) = directories::BaseDirs::new() {
        return Ok(base.home_dir().join(".claude"));
    }
    match std::env::var_os("HOME") {
        Some(home) => Ok(PathBuf::from(home).join(".claude")),
        None => Err(RalphError::HomeNotFound.into()),
    }
}

pub fn global_stop_path_in(home_claude: &Path) -> PathBuf {
    home_claude.join(GLOBAL_STOP_FILE_NAME)
}

pub fn stop_reason_path_in(home_claude: &Path) -> PathBuf {
    home_claude.join(STOP_REASON_FILE_NAME)
}
