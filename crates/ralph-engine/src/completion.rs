//! Completion detection: score the latest turn's output against a weighted
//! rubric.
//!
//! The score is the best single signal, not a sum: one unambiguous marker
//! beats three weak phrase hits. Weights come from config so they can be
//! tuned without a rebuild. Whether "complete" actually stops the loop is
//! the engine's call (budget minima must also be met).

use ralph_config::CompletionConfig;

/// Signals in rank order. Rank breaks ties when weights collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompletionSignal {
    /// `[x] TASK_COMPLETE` anywhere in the text.
    ExplicitMarker,
    /// Frontmatter `implementation-status: complete|done`.
    Frontmatter,
    /// Every markdown task-list item checked, at least one present.
    AllCheckboxes,
    /// Some `[x]` present and no `[ ]` remaining anywhere.
    NoUnchecked,
    /// A configured semantic phrase ("task complete", "all done", ...).
    Phrase,
}

impl CompletionSignal {
    pub fn describe(&self) -> &'static str {
        match self {
            CompletionSignal::ExplicitMarker => "explicit TASK_COMPLETE marker",
            CompletionSignal::Frontmatter => "frontmatter implementation-status",
            CompletionSignal::AllCheckboxes => "all task-list checkboxes checked",
            CompletionSignal::NoUnchecked => "checked boxes with none remaining",
            CompletionSignal::Phrase => "completion phrase",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionVerdict {
    /// Confidence in [0, 1].
    pub score: f64,
    pub signal: Option<CompletionSignal>,
    pub explanation: String,
}

impl CompletionVerdict {
    fn none() -> Self {
        Self {
            score: 0.0,
            signal: None,
            explanation: "no completion signal".to_string(),
        }
    }
}

/// Score one text against the rubric.
pub fn score_text(text: &str, config: &CompletionConfig) -> CompletionVerdict {
    if text.trim().is_empty() {
        return CompletionVerdict::none();
    }

    let lower = text.to_lowercase();

    // Candidates in rank order; a strictly greater weight later in the
    // list displaces an earlier one, equal weights keep the higher rank.
    let mut candidates: Vec<(CompletionSignal, f64)> = Vec::new();

    if lower.contains("[x] task_complete") {
        candidates.push((
            CompletionSignal::ExplicitMarker,
            config.explicit_marker_confidence,
        ));
    }
    if frontmatter_declares_complete(text) {
        candidates.push((
            CompletionSignal::Frontmatter,
            config.frontmatter_confidence,
        ));
    }

    let (checked_items, unchecked_items) = count_task_list_items(text);
    if checked_items >= 1 && unchecked_items == 0 {
        candidates.push((
            CompletionSignal::AllCheckboxes,
            config.all_checked_confidence,
        ));
    }
    if lower.contains("[x]") && !lower.contains("[ ]") {
        candidates.push((
            CompletionSignal::NoUnchecked,
            config.no_unchecked_confidence,
        ));
    }
    if config
        .completion_phrases
        .iter()
        .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
    {
        candidates.push((CompletionSignal::Phrase, config.phrase_confidence));
    }

    let mut best: Option<(CompletionSignal, f64)> = None;
    for (signal, weight) in candidates {
        match best {
            Some((_, best_weight)) if weight <= best_weight => {}
            _ => best = Some((signal, weight)),
        }
    }

    match best {
        Some((signal, weight)) => CompletionVerdict {
            score: weight,
            signal: Some(signal),
            explanation: format!("{} (confidence {weight})", signal.describe()),
        },
        None => CompletionVerdict::none(),
    }
}

/// Score the turn output and, when available, the focus file contents.
/// The better verdict wins; on a tie the output's verdict stands.
pub fn assess(
    output: &str,
    focus_text: Option<&str>,
    config: &CompletionConfig,
) -> CompletionVerdict {
    let from_output = score_text(output, config);
    match focus_text {
        Some(text) => {
            let from_focus = score_text(text, config);
            if from_focus.score > from_output.score {
                CompletionVerdict {
                    explanation: format!("focus file: {}", from_focus.explanation),
                    ..from_focus
                }
            } else {
                from_output
            }
        }
        None => from_output,
    }
}

/// Parse a leading `---` frontmatter block and look for
/// `implementation-status: complete` or `done`.
fn frontmatter_declares_complete(text: &str) -> bool {
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some("---") {
        return false;
    }
    for line in lines {
        let trimmed = line.trim();
        if trimmed == "---" {
            return false;
        }
        if let Some(value) = trimmed
            .strip_prefix("implementation-status:")
            .or_else(|| trimmed.strip_prefix("implementation_status:"))
        {
            let value = value.trim().to_lowercase();
            return value == "complete" || value == "done";
        }
    }
    false
}

/// Count markdown task-list items (`- [ ]` / `- [x]` / `* [x]`).
fn count_task_list_items(text: &str) -> (usize, usize) {
    let mut checked = 0;
    let mut unchecked = 0;
    for line in text.lines() {
        let trimmed = line.trim_start();
        let Some(rest) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        else {
            continue;
        };
        if rest.starts_with("[x]") || rest.starts_with("[X]") {
            checked += 1;
        } else if rest.starts_with("[ ]") {
            unchecked += 1;
        }
    }
    (checked, unchecked)
}
