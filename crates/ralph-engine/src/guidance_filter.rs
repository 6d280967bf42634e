//! Classify candidate next actions against guidance.
//!
//! Precedence: encouraged > forbidden > built-in busywork > allow.
//! Encouraged dominating forbidden lets a user whitelist one specific
//! activity out of a broader ban.

use ralph_config::Guidance;

/// Built-in busywork categories. Matching one makes a candidate SKIP,
/// a soft signal: the selector should prefer something else, but the user can
/// override by encouraging it.
const BUSYWORK: &[(&str, &[&str])] = &[
    (
        "documentation-only",
        &["documentation only", "docs only", "update readme", "docstring", "doc comments"],
    ),
    (
        "dependency-bumps",
        &["bump dependency", "bump dependencies", "upgrade dependencies", "update dependencies", "dependency bump"],
    ),
    (
        "formatting-only",
        &["reformat", "formatting only", "run formatter", "fix formatting", "whitespace"],
    ),
    ("ci-only", &["ci only", "ci config", "github actions", "pipeline config"]),
    ("type-hints-only", &["type hints", "type annotations only", "add typing"]),
    ("todo-cleanup", &["todo cleanup", "remove todos", "clean up todos"]),
    (
        "git-history-cleanup",
        &["rebase history", "squash commits", "rewrite history", "git history"],
    ),
    ("refactor-only", &["refactor only", "pure refactor", "cosmetic refactor"]),
];

/// Outcome of vetting one candidate activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidanceDecision {
    Allow,
    /// Built-in busywork; pick something with more substance.
    Skip { category: String },
    /// User-forbidden; the selector must choose a different candidate.
    Block { phrase: String },
}

impl GuidanceDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuidanceDecision::Allow)
    }
}

/// Vet a candidate next-action description.
pub fn classify(candidate: &str, guidance: &Guidance) -> GuidanceDecision {
    let lower = candidate.to_lowercase();

    if guidance
        .encouraged
        .iter()
        .any(|phrase| matches_phrase(&lower, phrase))
    {
        return GuidanceDecision::Allow;
    }

    if let Some(phrase) = guidance
        .forbidden
        .iter()
        .find(|phrase| matches_phrase(&lower, phrase))
    {
        return GuidanceDecision::Block {
            phrase: phrase.clone(),
        };
    }

    for (category, patterns) in BUSYWORK {
        if patterns.iter().any(|p| lower.contains(p)) {
            return GuidanceDecision::Skip {
                category: (*category).to_string(),
            };
        }
    }

    GuidanceDecision::Allow
}

fn matches_phrase(candidate_lower: &str, phrase: &str) -> bool {
    let phrase = phrase.trim().to_lowercase();
    !phrase.is_empty() && candidate_lower.contains(&phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn guidance(forbidden: &[&str], encouraged: &[&str]) -> Guidance {
        let mut g = Guidance::default();
        let now = Utc::now();
        for phrase in forbidden {
            g.add_forbidden(phrase, now);
        }
        for phrase in encouraged {
            g.add_encouraged(phrase, now);
        }
        g
    }

    #[test]
    fn test_plain_work_is_allowed() {
        let decision = classify("implement the retry logic in the fetcher", &guidance(&[], &[]));
        assert_eq!(decision, GuidanceDecision::Allow);
    }

    #[test]
    fn test_forbidden_substring_blocks() {
        let decision = classify(
            "run the database migrations for the new schema",
            &guidance(&["database migrations"], &[]),
        );
        assert_eq!(
            decision,
            GuidanceDecision::Block {
                phrase: "database migrations".into()
            }
        );
    }

    #[test]
    fn test_forbidden_match_is_case_insensitive() {
        let decision = classify(
            "Apply Database Migrations now",
            &guidance(&["database MIGRATIONS"], &[]),
        );
        assert!(matches!(decision, GuidanceDecision::Block { .. }));
    }

    #[test]
    fn test_encouraged_dominates_forbidden() {
        let decision = classify(
            "run the database migrations for the new schema",
            &guidance(&["database migrations"], &["database migrations"]),
        );
        assert_eq!(decision, GuidanceDecision::Allow);
    }

    #[test]
    fn test_busywork_skipped() {
        let decision = classify("update README with install notes", &guidance(&[], &[]));
        assert_eq!(
            decision,
            GuidanceDecision::Skip {
                category: "documentation-only".into()
            }
        );
    }

    #[test]
    fn test_each_busywork_category_matches() {
        let samples = [
            ("docs only pass over the module", "documentation-only"),
            ("bump dependencies to latest", "dependency-bumps"),
            ("fix formatting across the repo", "formatting-only"),
            ("tweak the ci config", "ci-only"),
            ("add typing to helpers", "type-hints-only"),
            ("todo cleanup sweep", "todo-cleanup"),
            ("squash commits on main", "git-history-cleanup"),
            ("pure refactor of the store", "refactor-only"),
        ];
        for (candidate, expected) in samples {
            match classify(candidate, &guidance(&[], &[])) {
                GuidanceDecision::Skip { category } => assert_eq!(category, expected),
                other => panic!("{candidate:?} classified as {other:?}"),
            }
        }
    }

    #[test]
    fn test_encouraged_dominates_busywork() {
        let decision = classify(
            "update README with install notes",
            &guidance(&[], &["readme"]),
        );
        assert_eq!(decision, GuidanceDecision::Allow);
    }

    #[test]
    fn test_forbidden_beats_busywork() {
        let decision = classify(
            "docs only pass over the module",
            &guidance(&["docs only"], &[]),
        );
        assert!(matches!(decision, GuidanceDecision::Block { .. }));
    }
}
