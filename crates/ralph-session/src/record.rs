//! The per-session persistent record.

use chrono::{DateTime, Utc};
use ralph_core::{AdapterVerdict, OutputFingerprint};
use serde::{Deserialize, Serialize};

/// Longest gap between two ticks that still counts as active runtime.
/// Anything longer (laptop lid closed, host paused) is ignored.
pub const RUNTIME_GAP_CEILING_SECONDS: i64 = 600;

/// One record per `(project, session_id)`, updated on every hook tick.
///
/// Every field except the identifiers is defaulted so records written by
/// older builds (or truncated by a crash) still load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<String>,

    #[serde(default)]
    pub project_path: String,

    pub started_at: DateTime<Utc>,

    /// When the previous tick ran; the next tick's runtime delta is
    /// measured from here.
    pub last_seen: DateTime<Utc>,

    /// Active CLI seconds, distinct from wall-clock (`now - started_at`).
    #[serde(default)]
    pub accumulated_runtime_seconds: u64,

    #[serde(default)]
    pub iteration_count: u32,

    /// Sliding window of recent output fingerprints, newest last.
    #[serde(default)]
    pub recent_outputs: Vec<OutputFingerprint>,

    #[serde(default)]
    pub last_completion_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_adapter_verdict: Option<AdapterVerdict>,

    /// Consecutive ticks whose output looked like a repeat.
    #[serde(default)]
    pub idle_streak: u32,

    #[serde(default)]
    pub focus_files: Vec<String>,

    /// Stop reasons emitted against this session, oldest first. Kept for
    /// archaeology; never read by the engine.
    #[serde(default)]
    pub stop_history: Vec<String>,

    /// Guidance timestamp as of the last tick, for "guidance updated"
    /// detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_seen_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    pub fn new(
        session_id: &str,
        parent_session_id: Option<&str>,
        project_path: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            parent_session_id: parent_session_id.map(|s| s.to_string()),
            project_path: project_path.to_string(),
            started_at: now,
            last_seen: now,
            accumulated_runtime_seconds: 0,
            iteration_count: 0,
            recent_outputs: Vec::new(),
            last_completion_score: 0.0,
            last_adapter_verdict: None,
            idle_streak: 0,
            focus_files: Vec::new(),
            stop_history: Vec::new(),
            guidance_seen_at: None,
        }
    }

    /// Advance the record by one tick: bump the iteration count and extend
    /// runtime by the gap since the previous tick, clamped so idle periods
    /// don't count as work.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let delta = (now - self.last_seen)
            .num_seconds()
            .clamp(0, RUNTIME_GAP_CEILING_SECONDS);
        self.accumulated_runtime_seconds = self
            .accumulated_runtime_seconds
            .saturating_add(delta as u64);
        self.iteration_count = self.iteration_count.saturating_add(1);
        self.last_seen = now;
    }

    /// Push a fingerprint onto the back of the window, evicting from the
    /// front at `window_size`.
    pub fn push_fingerprint(&mut self, fingerprint: OutputFingerprint, window_size: usize) {
        self.recent_outputs.push(fingerprint);
        while self.recent_outputs.len() > window_size {
            self.recent_outputs.remove(0);
        }
    }

    /// Current focus file, if any.
    pub fn focus_file(&self) -> Option<&str> {
        self.focus_files.first().map(|s| s.as_str())
    }

    /// Rotate the focus list so the next file becomes current. A no-op
    /// with zero or one entries.
    pub fn rotate_focus(&mut self) {
        if self.focus_files.len() > 1 {
            self.focus_files.rotate_left(1);
        }
    }

    pub fn runtime_hours(&self) -> f64 {
        self.accumulated_runtime_seconds as f64 / 3600.0
    }
}
