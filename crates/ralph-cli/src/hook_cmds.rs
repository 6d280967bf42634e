//! Hook entry points: stdin JSON in, one JSON object on stdout.
//!
//! Stdout is the wire; everything diagnostic goes to the project log file
//! via `tracing-appender`. A hook process must never crash the host
//! session: unparseable stdin emits the empty decision, and only
//! unrecoverable config corruption exits non-zero.

use anyhow::Result;
use chrono::Utc;
use ralph_config::{Config, paths};
use ralph_engine::{TickInput, run_stop_tick};
use ralph_hooks::{GuardDecision, HookInput, PermissionDecisionPayload, StopDecisionPayload};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Exit code for unrecoverable config corruption. The host treats any
/// non-zero as a continue, so this cannot strand the assistant.
const EXIT_FATAL: i32 = 2;

/// Run the stop-hook tick. Returns the process exit code.
pub fn run_stop_hook(project_override: Option<PathBuf>) -> Result<i32> {
    let raw = read_stdin();
    let Some(input) = parse_input(&raw) else {
        println!("{}", serde_json::to_string(&StopDecisionPayload::empty())?);
        return Ok(0);
    };

    let project_root = resolve_project_root(project_override, input.cwd.as_deref());
    let _log_guard = init_hook_logging(&project_root);

    let session_id = input
        .session_id
        .clone()
        .unwrap_or_else(|| "unknown-session".to_string());

    let tick = TickInput {
        project_root,
        home_claude: paths::home_claude_dir()?,
        session_id,
        parent_session_id: input.parent_session_id.clone(),
        transcript_path: input.transcript_path.as_deref().map(PathBuf::from),
        last_output: None,
        now: Utc::now(),
    };

    match run_stop_tick(&tick) {
        Ok(outcome) => {
            tracing::info!(
                decision = ?outcome.decision,
                iterations = outcome.audit.iterations,
                runtime_seconds = outcome.audit.runtime_seconds,
                "Stop-hook tick decided"
            );
            let payload = StopDecisionPayload::from_decision(&outcome.decision);
            println!("{}", serde_json::to_string(&payload)?);
            Ok(0)
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Unrecoverable engine failure");
            eprintln!("ralph: fatal: {e:#}");
            Ok(EXIT_FATAL)
        }
    }
}

/// Run the PreToolUse guard. Always exits 0; the guard fails open.
pub fn run_pretool_hook(project_override: Option<PathBuf>) -> Result<i32> {
    let raw = read_stdin();
    let Some(input) = parse_input(&raw) else {
        println!("{{}}");
        return Ok(0);
    };

    let project_root = resolve_project_root(project_override, input.cwd.as_deref());
    let _log_guard = init_hook_logging(&project_root);

    let Some(command) = input.tool_input.command.as_deref() else {
        // Not a shell command; nothing for the guard to parse.
        println!("{{}}");
        return Ok(0);
    };

    let protection = match Config::load(&project_root) {
        Ok(Some(config)) => config.protection,
        Ok(None) => ralph_config::ProtectionConfig::default(),
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "Guard could not load config, failing open");
            println!("{{}}");
            return Ok(0);
        }
    };

    match ralph_hooks::evaluate(command, &protection) {
        GuardDecision::Deny { reason } => {
            tracing::warn!(command = %command, reason = %reason, "Guard denied command");
            let payload = PermissionDecisionPayload::deny(reason);
            println!("{}", serde_json::to_string(&payload)?);
        }
        GuardDecision::Allow => {
            println!("{{}}");
        }
    }
    Ok(0)
}

fn read_stdin() -> String {
    let mut raw = String::new();
    let _ = std::io::stdin().read_to_string(&mut raw);
    raw
}

fn parse_input(raw: &str) -> Option<HookInput> {
    match HookInput::from_json(raw) {
        Ok(input) => Some(input),
        Err(e) => {
            // Logging is not set up yet (no project root); stderr is the
            // best available channel.
            eprintln!("ralph: unparseable hook payload: {e}");
            None
        }
    }
}

fn resolve_project_root(project_override: Option<PathBuf>, cwd: Option<&str>) -> PathBuf {
    project_override
        .or_else(|| cwd.map(PathBuf::from))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Send tracing to `.claude/ralph.log`. Stdout stays protocol-only.
/// The returned guard flushes buffered lines when the process exits.
fn init_hook_logging(project_root: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let claude_dir = paths::claude_dir(project_root);
    if std::fs::create_dir_all(&claude_dir).is_err() {
        return None;
    }
    let appender = tracing_appender::rolling::never(&claude_dir, paths::LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .ok();
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_project_root_prefers_override() {
        let root = resolve_project_root(Some(PathBuf::from("/a")), Some("/b"));
        assert_eq!(root, PathBuf::from("/a"));
    }

    #[test]
    fn test_resolve_project_root_uses_cwd_payload() {
        let root = resolve_project_root(None, Some("/b"));
        assert_eq!(root, PathBuf::from("/b"));
    }

    #[test]
    fn test_parse_input_rejects_garbage() {
        assert!(parse_input("not json").is_none());
        assert!(parse_input("{}").is_some());
    }
}
