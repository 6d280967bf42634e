//! Phase selection: implementation (drive the focus file) vs exploration
//! (survey and propose).

use crate::budget::BudgetReport;
use crate::completion::CompletionVerdict;
use crate::repetition::{RepetitionAction, RepetitionVerdict};
use ralph_core::Phase;
use ralph_session::SessionRecord;
use std::path::Path;

/// Pick the phase for the next turn.
///
/// Exploration wins when:
/// - repetition escalated past the reminder stage (the focus is going
///   nowhere), or
/// - the work looks complete but the minima aren't met yet (find new
///   work rather than re-polishing), or
/// - there is no focus file, or it vanished from disk.
///
/// Otherwise the focus file selects implementation.
pub fn select(
    project_root: &Path,
    session: &SessionRecord,
    completion: &CompletionVerdict,
    repetition: &RepetitionVerdict,
    budget: &BudgetReport,
    confidence_threshold: f64,
) -> Phase {
    if matches!(
        repetition.action,
        RepetitionAction::Explore | RepetitionAction::ForcePivot
    ) {
        return Phase::Exploration;
    }

    if completion.score >= confidence_threshold && !budget.minima_met() {
        return Phase::Exploration;
    }

    match session.focus_file() {
        Some(focus) if project_root.join(focus).exists() => Phase::Implementation,
        _ => Phase::Exploration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionSignal;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn session_with_focus(focus: &[&str]) -> SessionRecord {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut record = SessionRecord::new("s1", None, "/p", now);
        record.focus_files = focus.iter().map(|s| s.to_string()).collect();
        record
    }

    fn quiet_repetition() -> RepetitionVerdict {
        RepetitionVerdict {
            max_ratio: 0.1,
            is_repeat: false,
            idle_streak: 0,
            action: RepetitionAction::None,
        }
    }

    fn incomplete() -> CompletionVerdict {
        CompletionVerdict {
            score: 0.0,
            signal: None,
            explanation: "no completion signal".into(),
        }
    }

    fn budget(minima_met: bool) -> BudgetReport {
        BudgetReport {
            min_time_met: minima_met,
            min_iter_met: minima_met,
            max_exceeded: None,
            fraction_of_max: 0.5,
            runtime_hours: 0.05,
            wall_clock_seconds: 200,
        }
    }

    #[test]
    fn test_focus_file_selects_implementation() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("plan.md"), "- [ ] work").unwrap();
        let session = session_with_focus(&["plan.md"]);
        let phase = select(
            dir.path(),
            &session,
            &incomplete(),
            &quiet_repetition(),
            &budget(false),
            0.7,
        );
        assert_eq!(phase, Phase::Implementation);
    }

    #[test]
    fn test_no_focus_selects_exploration() {
        let dir = tempdir().unwrap();
        let session = session_with_focus(&[]);
        let phase = select(
            dir.path(),
            &session,
            &incomplete(),
            &quiet_repetition(),
            &budget(false),
            0.7,
        );
        assert_eq!(phase, Phase::Exploration);
    }

    #[test]
    fn test_vanished_focus_selects_exploration() {
        let dir = tempdir().unwrap();
        let session = session_with_focus(&["gone.md"]);
        let phase = select(
            dir.path(),
            &session,
            &incomplete(),
            &quiet_repetition(),
            &budget(false),
            0.7,
        );
        assert_eq!(phase, Phase::Exploration);
    }

    #[test]
    fn test_repetition_escalation_forces_exploration() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("plan.md"), "x").unwrap();
        let session = session_with_focus(&["plan.md"]);
        for action in [RepetitionAction::Explore, RepetitionAction::ForcePivot] {
            let repetition = RepetitionVerdict {
                max_ratio: 0.97,
                is_repeat: true,
                idle_streak: 3,
                action,
            };
            let phase = select(
                dir.path(),
                &session,
                &incomplete(),
                &repetition,
                &budget(false),
                0.7,
            );
            assert_eq!(phase, Phase::Exploration);
        }
    }

    #[test]
    fn test_first_repeat_reminder_keeps_implementation() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("plan.md"), "x").unwrap();
        let session = session_with_focus(&["plan.md"]);
        let repetition = RepetitionVerdict {
            max_ratio: 0.95,
            is_repeat: true,
            idle_streak: 1,
            action: RepetitionAction::Remind,
        };
        let phase = select(
            dir.path(),
            &session,
            &incomplete(),
            &repetition,
            &budget(false),
            0.7,
        );
        assert_eq!(phase, Phase::Implementation);
    }

    #[test]
    fn test_complete_before_minima_explores() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("plan.md"), "x").unwrap();
        let session = session_with_focus(&["plan.md"]);
        let completion = CompletionVerdict {
            score: 1.0,
            signal: Some(CompletionSignal::ExplicitMarker),
            explanation: "explicit TASK_COMPLETE marker".into(),
        };
        let phase = select(
            dir.path(),
            &session,
            &completion,
            &quiet_repetition(),
            &budget(false),
            0.7,
        );
        assert_eq!(phase, Phase::Exploration);
    }

    #[test]
    fn test_complete_with_minima_met_keeps_implementation() {
        // The engine stops before the phase matters, but selection stays
        // consistent anyway.
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("plan.md"), "x").unwrap();
        let session = session_with_focus(&["plan.md"]);
        let completion = CompletionVerdict {
            score: 1.0,
            signal: Some(CompletionSignal::ExplicitMarker),
            explanation: "explicit TASK_COMPLETE marker".into(),
        };
        let phase = select(
            dir.path(),
            &session,
            &completion,
            &quiet_repetition(),
            &budget(true),
            0.7,
        );
        assert_eq!(phase, Phase::Implementation);
    }
}
