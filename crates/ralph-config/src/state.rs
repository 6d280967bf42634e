//! Loop state machine (`.claude/ralph-state.json`).
//!
//! ```text
//!   Stopped  --start------> Running
//!   Running  --stop-------> Draining   (courtesy: one more tick finalizes)
//!   Draining --engine-----> Stopped
//!   Running  --engine-----> Stopped    (terminal stop emitted)
//! ```
//!
//! All other edges are rejected at the mutator with the file unchanged.

use crate::{io, paths};
use anyhow::Result;
use ralph_core::RalphError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    #[default]
    Stopped,
    Running,
    Draining,
}

impl LoopState {
    /// Attempt a transition to `next`, returning the new state or an error
    /// for an illegal edge.
    pub fn transition(self, next: LoopState) -> Result<LoopState, RalphError> {
        match (self, next) {
            (LoopState::Stopped, LoopState::Running)
            | (LoopState::Running, LoopState::Draining)
            | (LoopState::Running, LoopState::Stopped)
            | (LoopState::Draining, LoopState::Stopped) => Ok(next),
            (from, to) => Err(RalphError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopState::Stopped => write!(f, "stopped"),
            LoopState::Running => write!(f, "running"),
            LoopState::Draining => write!(f, "draining"),
        }
    }
}

/// The state file holds exactly one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    state: LoopState,
}

/// Read the current state. Absent or unparseable file means `Stopped`:
/// a project with no state file has no loop running.
pub fn load_state(project_root: &Path) -> Result<LoopState> {
    let path = paths::state_path(project_root);
    let Some(content) = io::read_with_retry(&path)? else {
        return Ok(LoopState::Stopped);
    };
    match serde_json::from_str::<StateFile>(&content) {
        Ok(file) => Ok(file.state),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "State file unparseable, treating as stopped"
            );
            Ok(LoopState::Stopped)
        }
    }
}

/// Transition the on-disk state to `next`, re-reading first so the check
/// always runs against the current document. Illegal edges leave the file
/// untouched.
pub fn transition_state(project_root: &Path, next: LoopState) -> Result<LoopState> {
    let current = load_state(project_root)?;
    let new_state = current.transition(next)?;
    let content = serde_json::to_string_pretty(&StateFile { state: new_state })?;
    io::write_atomic(&paths::state_path(project_root), &content)?;
    Ok(new_state)
}

/// Whether the kill-switch sentinel exists (`.claude/STOP_LOOP`).
pub fn kill_switch_present(project_root: &Path) -> bool {
    paths::kill_switch_path(project_root).exists()
}

/// Remove the kill switch, tolerating its absence.
pub fn clear_kill_switch(project_root: &Path) -> Result<()> {
    let path = paths::kill_switch_path(project_root);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to remove kill switch: {}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // ── Valid transitions ────────────────────────────────────────────

    #[test]
    fn test_stopped_to_running() {
        assert_eq!(
            LoopState::Stopped.transition(LoopState::Running).unwrap(),
            LoopState::Running
        );
    }

    #[test]
    fn test_running_to_draining() {
        assert_eq!(
            LoopState::Running.transition(LoopState::Draining).unwrap(),
            LoopState::Draining
        );
    }

    #[test]
    fn test_running_to_stopped() {
        assert_eq!(
            LoopState::Running.transition(LoopState::Stopped).unwrap(),
            LoopState::Stopped
        );
    }

    #[test]
    fn test_draining_to_stopped() {
        assert_eq!(
            LoopState::Draining.transition(LoopState::Stopped).unwrap(),
            LoopState::Stopped
        );
    }

    // ── Invalid transitions ─────────────────────────────────────────

    #[test]
    fn test_stopped_to_draining_rejected() {
        assert!(LoopState::Stopped.transition(LoopState::Draining).is_err());
    }

    #[test]
    fn test_draining_to_running_rejected() {
        assert!(LoopState::Draining.transition(LoopState::Running).is_err());
    }

    #[test]
    fn test_self_transitions_rejected() {
        assert!(LoopState::Stopped.transition(LoopState::Stopped).is_err());
        assert!(LoopState::Running.transition(LoopState::Running).is_err());
        assert!(LoopState::Draining.transition(LoopState::Draining).is_err());
    }

    // ── File behavior ───────────────────────────────────────────────

    #[test]
    fn test_load_absent_is_stopped() {
        let dir = tempdir().unwrap();
        assert_eq!(load_state(dir.path()).unwrap(), LoopState::Stopped);
    }

    #[test]
    fn test_transition_persists() {
        let dir = tempdir().unwrap();
        transition_state(dir.path(), LoopState::Running).unwrap();
        assert_eq!(load_state(dir.path()).unwrap(), LoopState::Running);
        transition_state(dir.path(), LoopState::Draining).unwrap();
        assert_eq!(load_state(dir.path()).unwrap(), LoopState::Draining);
    }

    #[test]
    fn test_illegal_transition_leaves_file_unchanged() {
        let dir = tempdir().unwrap();
        transition_state(dir.path(), LoopState::Running).unwrap();
        transition_state(dir.path(), LoopState::Stopped).unwrap();

        let err = transition_state(dir.path(), LoopState::Draining);
        assert!(err.is_err());
        assert_eq!(load_state(dir.path()).unwrap(), LoopState::Stopped);
    }

    #[test]
    fn test_unparseable_state_treated_as_stopped() {
        let dir = tempdir().unwrap();
        let path = paths::state_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(load_state(dir.path()).unwrap(), LoopState::Stopped);
    }

    #[test]
    fn test_kill_switch() {
        let dir = tempdir().unwrap();
        assert!(!kill_switch_present(dir.path()));

        let path = paths::kill_switch_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "").unwrap();
        assert!(kill_switch_present(dir.path()));

        clear_kill_switch(dir.path()).unwrap();
        assert!(!kill_switch_present(dir.path()));
        clear_kill_switch(dir.path()).unwrap();
    }
}
