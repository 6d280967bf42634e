//! Decision and verdict types exchanged between detectors and the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which mode the next turn should run in.
///
/// `Implementation` means the agent works toward a concrete focus file;
/// `Exploration` means it surveys the project and proposes new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Implementation,
    Exploration,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Implementation => write!(f, "implementation"),
            Phase::Exploration => write!(f, "exploration"),
        }
    }
}

/// Why the engine let a stop stand.
///
/// The adapter variant carries the adapter-supplied reason verbatim
/// (e.g. `overfit`), so the host and the status surface see the same string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    GlobalStop,
    NotApplicable,
    KillSwitch,
    Draining,
    MaxTime,
    MaxIterations,
    TaskComplete,
    Adapter(String),
}

impl StopReason {
    /// Stable string form used in the host payload, the stop-reason cache,
    /// and session stop history.
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::GlobalStop => "global_stop",
            StopReason::NotApplicable => "not_applicable",
            StopReason::KillSwitch => "kill_switch",
            StopReason::Draining => "draining",
            StopReason::MaxTime => "max_time",
            StopReason::MaxIterations => "max_iterations",
            StopReason::TaskComplete => "task_complete",
            StopReason::Adapter(reason) => reason,
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why the engine forced another turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueReason {
    Phase(Phase),
    /// An internal error was caught; the loop continues rather than
    /// silently abandoning the user's work.
    SafetyContinue,
}

impl std::fmt::Display for ContinueReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContinueReason::Phase(phase) => write!(f, "{phase}"),
            ContinueReason::SafetyContinue => write!(f, "safety_continue"),
        }
    }
}

/// The outcome of one stop-hook tick.
#[derive(Debug, Clone, PartialEq)]
pub enum LoopDecision {
    /// Force another turn. `next_prompt` is the rendered instruction
    /// document for that turn (absent only on `safety_continue`).
    Continue {
        reason: ContinueReason,
        next_prompt: Option<String>,
    },
    /// Let the assistant stop. `summary` is a one-line human explanation.
    Stop { reason: StopReason, summary: String },
}

impl LoopDecision {
    pub fn is_stop(&self) -> bool {
        matches!(self, LoopDecision::Stop { .. })
    }
}

/// Numbers backing a decision, recorded for the status surface and logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionAudit {
    pub iterations: u32,
    pub runtime_seconds: u64,
    pub wall_clock_seconds: i64,
    pub completion_score: f64,
    pub max_similarity: f64,
}

/// Metrics extracted from adapter run artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharpe: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wfe: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawdown: Option<f64>,
}

/// Advisory verdict from a project adapter.
///
/// Derived on demand from external artifacts; never a unilateral stop,
/// since the engine composes it with budget minima.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterVerdict {
    pub adapter_name: String,
    pub should_continue: bool,
    pub reason: String,

    #[serde(default)]
    pub metrics: AdapterMetrics,

    pub computed_at: DateTime<Utc>,
}

/// Compact record of one turn's output, kept in the repetition window.
///
/// `hash` is SHA-256 over the normalized text; `body` is the truncated
/// normalization itself, retained so near-duplicates (not just exact ones)
/// can be scored with a fuzzy ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFingerprint {
    pub hash: String,
    pub body: String,
}

impl OutputFingerprint {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_strings() {
        assert_eq!(StopReason::GlobalStop.as_str(), "global_stop");
        assert_eq!(StopReason::NotApplicable.as_str(), "not_applicable");
        assert_eq!(StopReason::KillSwitch.as_str(), "kill_switch");
        assert_eq!(StopReason::Draining.as_str(), "draining");
        assert_eq!(StopReason::MaxTime.as_str(), "max_time");
        assert_eq!(StopReason::MaxIterations.as_str(), "max_iterations");
        assert_eq!(StopReason::TaskComplete.as_str(), "task_complete");
        assert_eq!(StopReason::Adapter("overfit".into()).as_str(), "overfit");
    }

    #[test]
    fn test_continue_reason_display() {
        assert_eq!(
            ContinueReason::Phase(Phase::Implementation).to_string(),
            "implementation"
        );
        assert_eq!(
            ContinueReason::Phase(Phase::Exploration).to_string(),
            "exploration"
        );
        assert_eq!(ContinueReason::SafetyContinue.to_string(), "safety_continue");
    }

    #[test]
    fn test_phase_serde_snake_case() {
        let json = serde_json::to_string(&Phase::Implementation).unwrap();
        assert_eq!(json, "\"implementation\"");
        let back: Phase = serde_json::from_str("\"exploration\"").unwrap();
        assert_eq!(back, Phase::Exploration);
    }

    #[test]
    fn test_adapter_verdict_roundtrip() {
        let verdict = AdapterVerdict {
            adapter_name: "alpha-forge".into(),
            should_continue: false,
            reason: "overfit".into(),
            metrics: AdapterMetrics {
                sharpe: Some(1.2),
                wfe: Some(0.42),
                drawdown: None,
            },
            computed_at: Utc::now(),
        };

        let json = serde_json::to_string(&verdict).unwrap();
        let back: AdapterVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
        // Absent metrics are skipped entirely, not serialized as null.
        assert!(!json.contains("drawdown"));
    }

    #[test]
    fn test_adapter_verdict_tolerates_missing_metrics() {
        let json = r#"{
            "adapter_name": "alpha-forge",
            "should_continue": true,
            "reason": "no_data",
            "computed_at": "2026-01-15T10:00:00Z"
        }"#;
        let verdict: AdapterVerdict = serde_json::from_str(json).unwrap();
        assert_eq!(verdict.metrics, AdapterMetrics::default());
    }

    #[test]
    fn test_fingerprint_empty() {
        let fp = OutputFingerprint {
            hash: "e3b0c442".into(),
            body: String::new(),
        };
        assert!(fp.is_empty());
    }

    #[test]
    fn test_decision_is_stop() {
        let stop = LoopDecision::Stop {
            reason: StopReason::MaxTime,
            summary: "time budget exhausted".into(),
        };
        assert!(stop.is_stop());

        let cont = LoopDecision::Continue {
            reason: ContinueReason::Phase(Phase::Exploration),
            next_prompt: Some("# next".into()),
        };
        assert!(!cont.is_stop());
    }
}
