//! Repetition (loop) detection over a sliding window of output
//! fingerprints.
//!
//! Each turn's output is normalized and hashed; the truncated normalized
//! body is kept alongside the hash so near-duplicates score high even when
//! hashes differ. Consecutive repeats escalate: remind, then flip to
//! exploration, then force a focus rotation.

use ralph_core::OutputFingerprint;
use sha2::{Digest, Sha256};

/// How much normalized text to retain for fuzzy comparison.
pub const FINGERPRINT_BODY_LIMIT: usize = 2000;

/// Escalation ladder for consecutive repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionAction {
    /// Nothing notable this turn.
    None,
    /// Inject a "you are looping, pivot" reminder into the next prompt.
    Remind,
    /// Switch the next turn to the exploration phase.
    Explore,
    /// Rotate the focus file; the current one is going nowhere.
    ForcePivot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepetitionVerdict {
    /// Highest pairwise similarity between the new output and the window.
    pub max_ratio: f64,
    /// Whether this turn counts as a repeat (ratio at or above threshold).
    pub is_repeat: bool,
    /// Updated consecutive-repeat count.
    pub idle_streak: u32,
    pub action: RepetitionAction,
}

/// Fingerprint one turn's output: lowercase, collapse whitespace, hash,
/// truncate.
pub fn fingerprint(text: &str) -> OutputFingerprint {
    let normalized = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let hash = format!("{:x}", Sha256::digest(normalized.as_bytes()));
    let body = normalized.chars().take(FINGERPRINT_BODY_LIMIT).collect();
    OutputFingerprint { hash, body }
}

/// Compare the new output against every retained fingerprint and update
/// the idle streak.
///
/// The threshold is inclusive: a ratio exactly at `similarity_threshold`
/// counts as a repeat.
pub fn assess(
    window: &[OutputFingerprint],
    candidate: &OutputFingerprint,
    similarity_threshold: f64,
    prior_idle_streak: u32,
) -> RepetitionVerdict {
    let max_ratio = window
        .iter()
        .map(|retained| similarity(retained, candidate))
        .fold(0.0_f64, f64::max);

    let is_repeat = !window.is_empty() && max_ratio >= similarity_threshold;
    let idle_streak = if is_repeat { prior_idle_streak + 1 } else { 0 };

    RepetitionVerdict {
        max_ratio,
        is_repeat,
        idle_streak,
        action: schedule(idle_streak),
    }
}

/// Intervention for a given streak length.
pub fn schedule(idle_streak: u32) -> RepetitionAction {
    match idle_streak {
        0 => RepetitionAction::None,
        1 => RepetitionAction::Remind,
        2 => RepetitionAction::Explore,
        _ => RepetitionAction::ForcePivot,
    }
}

fn similarity(a: &OutputFingerprint, b: &OutputFingerprint) -> f64 {
    if a.hash == b.hash {
        return 1.0;
    }
    if a.body.is_empty() || b.body.is_empty() {
        // An empty output can only ever equal another empty output, and
        // equal hashes already caught that.
        return 0.0;
    }
    strsim::normalized_levenshtein(&a.body, &b.body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_normalizes_whitespace_and_case() {
        let a = fingerprint("Fixed the   parser\n\nbug");
        let b = fingerprint("fixed the parser bug");
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.body, "fixed the parser bug");
    }

    #[test]
    fn test_fingerprint_truncates_body() {
        let long = "word ".repeat(1000);
        let fp = fingerprint(&long);
        assert_eq!(fp.body.chars().count(), FINGERPRINT_BODY_LIMIT);
        // Hash covers the full normalization, not the truncation.
        let fp2 = fingerprint(&"word ".repeat(1001));
        assert_ne!(fp.hash, fp2.hash);
    }

    #[test]
    fn test_identical_outputs_are_repeats() {
        let fp = fingerprint("same output every time");
        let verdict = assess(&[fp.clone()], &fp, 0.9, 0);
        assert_eq!(verdict.max_ratio, 1.0);
        assert!(verdict.is_repeat);
        assert_eq!(verdict.idle_streak, 1);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // One edit across ten characters: ratio exactly 0.9.
        let a = fingerprint("aaaaaaaaaa");
        let b = fingerprint("aaaaaaaaab");
        let verdict = assess(&[a], &b, 0.9, 0);
        assert!((verdict.max_ratio - 0.9).abs() < 1e-9);
        assert!(verdict.is_repeat);
    }

    #[test]
    fn test_below_threshold_is_not_repeat() {
        let a = fingerprint("implemented the session store");
        let b = fingerprint("completely different work on the parser");
        let verdict = assess(&[a], &b, 0.9, 2);
        assert!(!verdict.is_repeat);
        assert_eq!(verdict.idle_streak, 0);
        assert_eq!(verdict.action, RepetitionAction::None);
    }

    #[test]
    fn test_empty_window_never_repeats() {
        let fp = fingerprint("anything");
        let verdict = assess(&[], &fp, 0.9, 5);
        assert!(!verdict.is_repeat);
        assert_eq!(verdict.idle_streak, 0);
    }

    #[test]
    fn test_empty_output_cannot_match_nonempty() {
        let window = [fingerprint("real output")];
        let verdict = assess(&window, &fingerprint(""), 0.9, 0);
        assert_eq!(verdict.max_ratio, 0.0);
        assert!(!verdict.is_repeat);
    }

    #[test]
    fn test_empty_output_matches_empty_output() {
        let window = [fingerprint("")];
        let verdict = assess(&window, &fingerprint("   \n"), 0.9, 0);
        assert_eq!(verdict.max_ratio, 1.0);
        assert!(verdict.is_repeat);
    }

    #[test]
    fn test_max_over_window() {
        let window = [
            fingerprint("totally unrelated text about budgets"),
            fingerprint("nearly identical output text here"),
        ];
        let candidate = fingerprint("nearly identical output text her");
        let verdict = assess(&window, &candidate, 0.9, 0);
        assert!(verdict.max_ratio > 0.9);
        assert!(verdict.is_repeat);
    }

    #[test]
    fn test_escalation_ladder() {
        assert_eq!(schedule(0), RepetitionAction::None);
        assert_eq!(schedule(1), RepetitionAction::Remind);
        assert_eq!(schedule(2), RepetitionAction::Explore);
        assert_eq!(schedule(3), RepetitionAction::ForcePivot);
        assert_eq!(schedule(10), RepetitionAction::ForcePivot);
    }

    #[test]
    fn test_streak_accumulates_across_ticks() {
        let fp = fingerprint("stuck on the same thing");
        let mut streak = 0;
        for expected in 1..=4 {
            let verdict = assess(&[fp.clone()], &fp, 0.9, streak);
            assert_eq!(verdict.idle_streak, expected);
            streak = verdict.idle_streak;
        }
        assert_eq!(schedule(streak), RepetitionAction::ForcePivot);
    }
}
