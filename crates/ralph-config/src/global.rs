//! Home-directory signals shared by every project.
//!
//! The global stop file overrides any project-local state: the engine
//! consults it before anything else. Last writer wins; readers trust the
//! file's contents at read time. The stop-reason cache feeds the status
//! surface.

use crate::{io, paths};
use anyhow::Result;
use chrono::{DateTime, Utc};
use ralph_core::DecisionAudit;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Process-wide stop signal (`~/.claude/ralph-global-stop.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalStop {
    /// Always `"stopped"`; the file's existence is the signal, the field
    /// keeps the document self-describing.
    pub state: String,
    pub timestamp: DateTime<Utc>,
}

impl GlobalStop {
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            state: "stopped".to_string(),
            timestamp,
        }
    }
}

/// Last stop reason emitted by any engine (`~/.claude/ralph-stop-reason.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReasonCache {
    pub reason: String,
    pub summary: String,
    pub project_path: String,
    pub session_id: String,
    pub recorded_at: DateTime<Utc>,

    #[serde(default)]
    pub audit: DecisionAudit,
}

pub fn write_global_stop(home_claude: &Path, signal: &GlobalStop) -> Result<()> {
    let content = serde_json::to_string_pretty(signal)?;
    io::write_atomic(&paths::global_stop_path_in(home_claude), &content)
}

/// Read the global stop signal. Unparseable content is treated as a stop
/// request at epoch-unknown (the safe reading of a file someone clearly
/// wrote to stop the loop) and logged.
pub fn read_global_stop(home_claude: &Path) -> Result<Option<GlobalStop>> {
    let path = paths::global_stop_path_in(home_claude);
    let Some(content) = io::read_with_retry(&path)? else {
        return Ok(None);
    };
    match serde_json::from_str::<GlobalStop>(&content) {
        Ok(signal) => Ok(Some(signal)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Global stop file unparseable, honoring it anyway"
            );
            Ok(Some(GlobalStop::at(DateTime::<Utc>::MIN_UTC)))
        }
    }
}

pub fn clear_global_stop(home_claude: &Path) -> Result<()> {
    let path = paths::global_stop_path_in(home_claude);
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("Failed to remove global stop: {}", path.display()))),
    }
}

pub fn write_stop_reason(home_claude: &Path, cache: &StopReasonCache) -> Result<()> {
    let content = serde_json::to_string_pretty(cache)?;
    io::write_atomic(&paths::stop_reason_path_in(home_claude), &content)
}

pub fn read_stop_reason(home_claude: &Path) -> Result<Option<StopReasonCache>> {
    let path = paths::stop_reason_path_in(home_claude);
    let Some(content) = io::read_with_retry(&path)? else {
        return Ok(None);
    };
    match serde_json::from_str(&content) {
        Ok(cache) => Ok(Some(cache)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Stop-reason cache unparseable, ignoring"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_global_stop_roundtrip() {
        let dir = tempdir().unwrap();
        let signal = GlobalStop::at(Utc::now());
        write_global_stop(dir.path(), &signal).unwrap();

        let read = read_global_stop(dir.path()).unwrap().unwrap();
        assert_eq!(read, signal);
        assert_eq!(read.state, "stopped");
    }

    #[test]
    fn test_global_stop_absent() {
        let dir = tempdir().unwrap();
        assert!(read_global_stop(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_global_stop_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        write_global_stop(dir.path(), &GlobalStop::at(Utc::now())).unwrap();
        clear_global_stop(dir.path()).unwrap();
        clear_global_stop(dir.path()).unwrap();
        assert!(read_global_stop(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_unparseable_global_stop_still_stops() {
        let dir = tempdir().unwrap();
        std::fs::write(paths::global_stop_path_in(dir.path()), "garbage").unwrap();
        let read = read_global_stop(dir.path()).unwrap().unwrap();
        assert_eq!(read.timestamp, DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_stop_reason_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = StopReasonCache {
            reason: "max_iterations".into(),
            summary: "21 of 20 iterations used".into(),
            project_path: "/work/proj".into(),
            session_id: "sess-1".into(),
            recorded_at: Utc::now(),
            audit: DecisionAudit {
                iterations: 21,
                runtime_seconds: 612,
                wall_clock_seconds: 700,
                completion_score: 0.0,
                max_similarity: 0.4,
            },
        };
        write_stop_reason(dir.path(), &cache).unwrap();

        let read = read_stop_reason(dir.path()).unwrap().unwrap();
        assert_eq!(read.reason, "max_iterations");
        assert_eq!(read.audit.iterations, 21);
    }
}
