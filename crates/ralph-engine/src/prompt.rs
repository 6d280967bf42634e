//! Render the instruction document for the next turn.
//!
//! Rendering is a pure function of its context: no clock, no filesystem.
//! The engine gathers everything (config, session, verdicts, constraint
//! list) before calling in, which keeps the composed prompt reproducible
//! from persisted state.

use crate::guidance_filter::{self, GuidanceDecision};
use crate::repetition::{RepetitionAction, RepetitionVerdict};
use crate::budget::BudgetReport;
use chrono::{DateTime, Utc};
use ralph_config::{Config, Constraint};
use ralph_core::{AdapterVerdict, Phase};
use ralph_session::SessionRecord;

/// Most candidate actions to surface per prompt.
const MAX_CANDIDATES: usize = 5;

pub struct PromptContext<'a> {
    pub config: &'a Config,
    pub session: &'a SessionRecord,
    pub phase: Phase,
    pub budget: &'a BudgetReport,
    pub repetition: &'a RepetitionVerdict,
    pub adapter_verdict: Option<&'a AdapterVerdict>,
    /// Unacknowledged preflight constraints.
    pub constraints: &'a [Constraint],
    /// Set when the guidance timestamp moved since the previous tick.
    pub guidance_updated: Option<DateTime<Utc>>,
    /// The previous turn's output, mined for candidate next actions.
    pub last_output: &'a str,
}

/// Render the full Markdown instruction document.
pub fn render(ctx: &PromptContext) -> String {
    let mut doc = String::new();

    // Version banner and phase.
    doc.push_str(&format!(
        "# Ralph loop v{} (autonomous iteration)\n\n",
        env!("CARGO_PKG_VERSION")
    ));
    doc.push_str(&format!("**Phase:** {}\n\n", ctx.phase));

    // Budget snapshot.
    let limits = &ctx.config.loop_limits;
    doc.push_str(&format!(
        "**Budget:** iteration {}/{}, runtime {:.2}h/{:.2}h\n\n",
        ctx.session.iteration_count,
        limits.max_iterations,
        ctx.budget.runtime_hours,
        limits.max_hours,
    ));

    if let Some(updated_at) = ctx.guidance_updated {
        doc.push_str(&format!(
            "> Guidance updated at {}. Re-read the lists below before choosing work.\n\n",
            updated_at.to_rfc3339()
        ));
    }

    let guidance = &ctx.config.guidance;
    if !guidance.forbidden.is_empty() {
        doc.push_str("## BLOCKED\n\nDo not work on any of these:\n\n");
        for phrase in &guidance.forbidden {
            doc.push_str(&format!("- {phrase}\n"));
        }
        doc.push('\n');
    }
    if !guidance.encouraged.is_empty() {
        doc.push_str("## PRIORITIES\n\nPrefer these over anything else:\n\n");
        for phrase in &guidance.encouraged {
            doc.push_str(&format!("- {phrase}\n"));
        }
        doc.push('\n');
    }

    if let Some(focus) = ctx.session.focus_file() {
        doc.push_str(&format!("**Focus file:** `{focus}`\n\n"));
    }

    if let Some(verdict) = ctx.adapter_verdict {
        doc.push_str(&format!(
            "**{} verdict:** {}",
            verdict.adapter_name, verdict.reason
        ));
        let mut parts = Vec::new();
        if let Some(sharpe) = verdict.metrics.sharpe {
            parts.push(format!("sharpe {sharpe:.2}"));
        }
        if let Some(wfe) = verdict.metrics.wfe {
            parts.push(format!("WFE {wfe:.2}"));
        }
        if let Some(drawdown) = verdict.metrics.drawdown {
            parts.push(format!("drawdown {drawdown:.2}"));
        }
        if !parts.is_empty() {
            doc.push_str(&format!(" ({})", parts.join(", ")));
        }
        doc.push_str("\n\n");
    }

    if !ctx.constraints.is_empty() {
        doc.push_str("## Open constraints\n\n");
        for constraint in ctx.constraints {
            doc.push_str(&format!(
                "- [{}] {}: {}",
                constraint.severity, constraint.id, constraint.description
            ));
            if !constraint.recommendation.is_empty() {
                doc.push_str(&format!(" (recommendation: {})", constraint.recommendation));
            }
            doc.push('\n');
        }
        doc.push('\n');
    }

    if ctx.repetition.is_repeat {
        doc.push_str(&looping_notice(ctx.repetition));
        doc.push_str("\n\n");
    }

    let candidates = vetted_candidates(ctx);
    if !candidates.is_empty() {
        doc.push_str("## Suggested next actions\n\n");
        for candidate in &candidates {
            doc.push_str(&format!("- {candidate}\n"));
        }
        doc.push('\n');
    }

    doc.push_str(phase_protocol(ctx.phase));
    doc
}

fn looping_notice(repetition: &RepetitionVerdict) -> String {
    match repetition.action {
        RepetitionAction::Remind => format!(
            "**You are looping, pivot.** Your last {} outputs were {:.0}% similar. \
             Take a different approach this turn.",
            repetition.idle_streak + 1,
            repetition.max_ratio * 100.0
        ),
        RepetitionAction::Explore | RepetitionAction::ForcePivot => format!(
            "**You are looping, pivot.** {} near-identical turns in a row \
             ({:.0}% similar). The current angle is exhausted; switch to \
             exploration and pick different work.",
            repetition.idle_streak,
            repetition.max_ratio * 100.0
        ),
        RepetitionAction::None => String::new(),
    }
}

/// Mine the previous output for candidate next actions and vet each
/// through the guidance filter. Blocked and busywork candidates are
/// dropped here and never reach the prompt.
fn vetted_candidates(ctx: &PromptContext) -> Vec<String> {
    let mut candidates = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for line in ctx.last_output.lines() {
        let trimmed = line.trim();
        let candidate = if let Some(rest) = trimmed
            .strip_prefix("- [ ]")
            .or_else(|| trimmed.strip_prefix("* [ ]"))
        {
            rest.trim()
        } else if let Some(rest) = strip_prefix_ci(trimmed, "next step:")
            .or_else(|| strip_prefix_ci(trimmed, "next steps:"))
            .or_else(|| strip_prefix_ci(trimmed, "next:"))
        {
            rest.trim()
        } else {
            continue;
        };

        if candidate.is_empty() || !seen.insert(candidate.to_lowercase()) {
            continue;
        }
        if guidance_filter::classify(candidate, &ctx.config.guidance)
            == GuidanceDecision::Allow
        {
            candidates.push(candidate.to_string());
            if candidates.len() == MAX_CANDIDATES {
                break;
            }
        }
    }

    candidates
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn phase_protocol(phase: Phase) -> &'static str {
    match phase {
        Phase::Implementation => {
            "## Protocol: implementation\n\n\
             1. Open the focus file and find the first unchecked item.\n\
             2. Implement it end to end, including tests.\n\
             3. Check the item off in the focus file when it is verified.\n\
             4. If every item is checked and the work is genuinely done, \
             write `[x] TASK_COMPLETE` on its own line in your summary.\n\
             5. Do not invent new scope; unlisted ideas go at the bottom of \
             the focus file as unchecked items.\n"
        }
        Phase::Exploration => {
            "## Protocol: exploration\n\n\
             1. Survey the project: recent changes, failing tests, open \
             constraints, rough edges.\n\
             2. Pick the highest-leverage piece of real work; skip \
             busywork and anything in BLOCKED.\n\
             3. Write a short plan as a checklist in a focus document, then \
             start on the first item.\n\
             4. State plainly in your summary what you chose and why.\n"
        }
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
