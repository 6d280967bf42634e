//! Session record persistence (`.claude/ralph-sessions/<id>.json`).
//!
//! Records are written atomically every tick and retained indefinitely.
//! A corrupt record is renamed aside and recreated fresh rather than
//! aborting the loop.

use crate::record::SessionRecord;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ralph_config::{io, paths};
use std::fs;
use std::path::{Path, PathBuf};

/// Session ids come from the host; keep them path-safe before they become
/// file names.
pub fn validate_session_id(session_id: &str) -> Result<()> {
    if session_id.is_empty() || session_id.len() > 128 {
        anyhow::bail!("Session id must be 1..=128 characters");
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("Session id '{session_id}' contains unsupported characters");
    }
    Ok(())
}

pub fn session_path(project_root: &Path, session_id: &str) -> PathBuf {
    paths::sessions_dir(project_root).join(format!("{session_id}.json"))
}

/// Load a record if it exists. Corrupt records are moved aside to
/// `<id>.json.corrupt` and reported as absent.
pub fn load_session(project_root: &Path, session_id: &str) -> Result<Option<SessionRecord>> {
    validate_session_id(session_id)?;
    let path = session_path(project_root, session_id);
    let Some(content) = io::read_with_retry(&path)? else {
        return Ok(None);
    };
    match serde_json::from_str::<SessionRecord>(&content) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            let corrupt_path = corrupt_sibling(&path);
            if let Err(rename_err) = fs::rename(&path, &corrupt_path) {
                tracing::warn!(
                    path = %path.display(),
                    error = %rename_err,
                    "Failed to move corrupt session record aside"
                );
            } else {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    backup = %corrupt_path.display(),
                    "Recovered corrupt session record"
                );
            }
            Ok(None)
        }
    }
}

/// Load or create the record for this tick's session.
///
/// On first touch of a child session (the host reported a parent), focus
/// targets and the idle streak are copied from the parent so logical
/// continuity survives host-side resumes.
pub fn load_or_create(
    project_root: &Path,
    session_id: &str,
    parent_session_id: Option<&str>,
    initial_focus: &[String],
    now: DateTime<Utc>,
) -> Result<SessionRecord> {
    if let Some(record) = load_session(project_root, session_id)? {
        return Ok(record);
    }

    let mut record = SessionRecord::new(
        session_id,
        parent_session_id,
        &project_root.to_string_lossy(),
        now,
    );
    record.focus_files = initial_focus.to_vec();

    if let Some(parent_id) = parent_session_id {
        match load_session(project_root, parent_id) {
            Ok(Some(parent)) => {
                record.focus_files = parent.focus_files.clone();
                record.idle_streak = parent.idle_streak;
            }
            Ok(None) => {
                tracing::debug!(parent_id = %parent_id, "Parent session has no record");
            }
            Err(e) => {
                tracing::warn!(parent_id = %parent_id, error = %e, "Failed to read parent session");
            }
        }
    }

    Ok(record)
}

pub fn save_session(project_root: &Path, record: &SessionRecord) -> Result<()> {
    validate_session_id(&record.session_id)?;
    let path = session_path(project_root, &record.session_id);
    let content =
        serde_json::to_string_pretty(record).context("Failed to serialize session record")?;
    io::write_atomic(&path, &content)
}

/// All session records for a project, skipping unreadable ones.
pub fn list_sessions(project_root: &Path) -> Result<Vec<SessionRecord>> {
    let dir = paths::sessions_dir(project_root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(&dir)
        .with_context(|| format!("Failed to read sessions dir: {}", dir.display()))?
    {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(content) = io::read_with_retry(&path)? else {
            continue;
        };
        match serde_json::from_str::<SessionRecord>(&content) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable session");
            }
        }
    }
    Ok(records)
}

/// The most recently active session, for the status surface.
pub fn newest_session(project_root: &Path) -> Result<Option<SessionRecord>> {
    let mut records = list_sessions(project_root)?;
    records.sort_by_key(|r| r.last_seen);
    Ok(records.pop())
}

fn corrupt_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}
