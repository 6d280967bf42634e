//! The stop decision engine: one hook tick, end to end.
//!
//! Order of checks mirrors the severity ladder (global stop, project
//! applicability, kill switch, budget maxima, completion, adapter) and
//! only then a composed continue. Detector failures inside the tick never
//! stop the loop: they degrade to a `safety_continue` so an internal bug
//! cannot silently abandon the user's work.

use crate::budget::{self, MaxExceeded};
use crate::completion;
use crate::phase;
use crate::prompt::{self, PromptContext};
use crate::adapter;
use crate::repetition::{self, RepetitionAction};
use crate::transcript;
use anyhow::Result;
use chrono::{DateTime, Utc};
use ralph_config::{Config, LoopState, StopReasonCache};
use ralph_core::{ContinueReason, DecisionAudit, LoopDecision, StopReason};
use ralph_session::SessionRecord;
use std::path::{Path, PathBuf};

/// Everything one tick needs. `now` is explicit so ticks are replayable.
#[derive(Debug, Clone)]
pub struct TickInput {
    pub project_root: PathBuf,
    /// `~/.claude` (injectable for tests).
    pub home_claude: PathBuf,
    pub session_id: String,
    pub parent_session_id: Option<String>,
    pub transcript_path: Option<PathBuf>,
    /// Direct output text, preferred over the transcript when present.
    pub last_output: Option<String>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub decision: LoopDecision,
    pub audit: DecisionAudit,
}

/// Run one stop-hook tick.
///
/// The only fatal error out of here is unrecoverable config corruption;
/// everything else resolves to a decision.
pub fn run_stop_tick(input: &TickInput) -> Result<TickOutcome> {
    let root = input.project_root.as_path();

    // Global stop overrides everything, including a corrupt config.
    if let Some(signal) = ralph_config::read_global_stop(&input.home_claude)? {
        let session = ralph_session::load_session(root, &input.session_id).unwrap_or(None);
        let applies = match &session {
            Some(record) => signal.timestamp > record.started_at,
            None => true,
        };
        if applies {
            return Ok(finalize_stop(
                input,
                session,
                StopReason::GlobalStop,
                "global stop signal is set".to_string(),
                DecisionAudit::default(),
            ));
        }
    }

    // Fatal if corrupt beyond the backup; None means never started here.
    let Some(config) = Config::load(root)? else {
        return Ok(stop_without_session(
            StopReason::NotApplicable,
            "no loop config in this project".to_string(),
        ));
    };

    match ralph_config::load_state(root)? {
        LoopState::Stopped => {
            return Ok(stop_without_session(
                StopReason::NotApplicable,
                "loop is stopped".to_string(),
            ));
        }
        LoopState::Draining => {
            let session = ralph_session::load_session(root, &input.session_id).unwrap_or(None);
            return Ok(finalize_stop(
                input,
                session,
                StopReason::Draining,
                "stop requested; draining tick finalized".to_string(),
                DecisionAudit::default(),
            ));
        }
        LoopState::Running => {}
    }

    let Some(project_adapter) = adapter::select(root) else {
        return Ok(stop_without_session(
            StopReason::NotApplicable,
            "project not recognised by any adapter".to_string(),
        ));
    };

    if ralph_config::kill_switch_present(root) {
        let session = ralph_session::load_session(root, &input.session_id).unwrap_or(None);
        return Ok(finalize_stop(
            input,
            session,
            StopReason::KillSwitch,
            "kill switch file present".to_string(),
            DecisionAudit::default(),
        ));
    }

    // Steps 4-8: anything that breaks in here is a safety continue.
    match tick_inner(input, &config, project_adapter.as_ref()) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!(
                error = %format!("{e:#}"),
                session_id = %input.session_id,
                "Tick failed internally; continuing rather than abandoning work"
            );
            Ok(TickOutcome {
                decision: LoopDecision::Continue {
                    reason: ContinueReason::SafetyContinue,
                    next_prompt: None,
                },
                audit: DecisionAudit::default(),
            })
        }
    }
}

fn tick_inner(
    input: &TickInput,
    config: &Config,
    project_adapter: &dyn adapter::Adapter,
) -> Result<TickOutcome> {
    let root = input.project_root.as_path();

    // Step 4: session bookkeeping.
    let mut session = ralph_session::load_or_create(
        root,
        &input.session_id,
        input.parent_session_id.as_deref(),
        &config.focus_files,
        input.now,
    )?;
    session.touch(input.now);

    // Step 5: fingerprint the latest output against the window.
    let output = match &input.last_output {
        Some(text) => text.clone(),
        None => input
            .transcript_path
            .as_deref()
            .map(transcript::read_last_output)
            .unwrap_or_default(),
    };
    let fingerprint = repetition::fingerprint(&output);
    let rep_verdict = repetition::assess(
        &session.recent_outputs,
        &fingerprint,
        config.loop_detection.similarity_threshold,
        session.idle_streak,
    );
    session.push_fingerprint(fingerprint, config.loop_detection.window_size);
    session.idle_streak = rep_verdict.idle_streak;

    // Step 6: budget.
    let budget_report = budget::assess(&config.loop_limits, &session, input.now);

    // Step 7: completion (output plus the focus file when readable).
    let focus_text = session
        .focus_file()
        .map(|focus| root.join(focus))
        .and_then(|path| std::fs::read_to_string(path).ok());
    let completion_verdict = completion::assess(&output, focus_text.as_deref(), &config.completion);
    session.last_completion_score = completion_verdict.score;

    // Step 8: adapter.
    let adapter_verdict = project_adapter.verdict(root, input.now);
    session.last_adapter_verdict = Some(adapter_verdict.clone());

    let audit = DecisionAudit {
        iterations: session.iteration_count,
        runtime_seconds: session.accumulated_runtime_seconds,
        wall_clock_seconds: budget_report.wall_clock_seconds,
        completion_score: completion_verdict.score,
        max_similarity: rep_verdict.max_ratio,
    };

    if let Some(exceeded) = budget_report.max_exceeded {
        let (reason, summary) = match exceeded {
            MaxExceeded::Time => (
                StopReason::MaxTime,
                format!(
                    "runtime {:.2}h exceeded the {:.2}h maximum",
                    budget_report.runtime_hours, config.loop_limits.max_hours
                ),
            ),
            MaxExceeded::Iterations => (
                StopReason::MaxIterations,
                format!(
                    "iteration {} exceeded the maximum of {}",
                    session.iteration_count, config.loop_limits.max_iterations
                ),
            ),
        };
        return Ok(finalize_stop(input, Some(session), reason, summary, audit));
    }

    if completion_verdict.score >= config.completion.confidence_threshold
        && budget_report.minima_met()
    {
        let summary = format!("task complete: {}", completion_verdict.explanation);
        return Ok(finalize_stop(
            input,
            Some(session),
            StopReason::TaskComplete,
            summary,
            audit,
        ));
    }

    if !adapter_verdict.should_continue && budget_report.minima_met() {
        let reason = StopReason::Adapter(adapter_verdict.reason.clone());
        let summary = format!(
            "{} adapter reports {}",
            adapter_verdict.adapter_name, adapter_verdict.reason
        );
        return Ok(finalize_stop(input, Some(session), reason, summary, audit));
    }

    // Step 9: compose the next turn.
    if rep_verdict.action == RepetitionAction::ForcePivot {
        session.rotate_focus();
    }
    let next_phase = phase::select(
        root,
        &session,
        &completion_verdict,
        &rep_verdict,
        &budget_report,
        config.completion.confidence_threshold,
    );

    let guidance_updated = guidance_freshness(config, &session);
    let constraints = unacknowledged_constraints(root, config);
    let rendered = prompt::render(&PromptContext {
        config,
        session: &session,
        phase: next_phase,
        budget: &budget_report,
        repetition: &rep_verdict,
        adapter_verdict: Some(&adapter_verdict),
        constraints: &constraints,
        guidance_updated,
        last_output: &output,
    });

    // Step 10: persist.
    session.guidance_seen_at = config.guidance.timestamp;
    ralph_session::save_session(root, &session)?;

    Ok(TickOutcome {
        decision: LoopDecision::Continue {
            reason: ContinueReason::Phase(next_phase),
            next_prompt: Some(rendered),
        },
        audit,
    })
}

/// A guidance timestamp the session has not seen yet.
fn guidance_freshness(config: &Config, session: &SessionRecord) -> Option<DateTime<Utc>> {
    let updated_at = config.guidance.timestamp?;
    match session.guidance_seen_at {
        Some(seen) if seen >= updated_at => None,
        _ => Some(updated_at),
    }
}

fn unacknowledged_constraints(
    root: &Path,
    config: &Config,
) -> Vec<ralph_config::Constraint> {
    let acked = ralph_config::load_acked_ids(root).unwrap_or_default();
    ralph_config::constraints_from_scan(config)
        .into_iter()
        .filter(|c| !acked.contains(&c.id))
        .collect()
}

/// Terminal stop bookkeeping: state machine, stop history, reason cache.
fn finalize_stop(
    input: &TickInput,
    session: Option<SessionRecord>,
    reason: StopReason,
    summary: String,
    audit: DecisionAudit,
) -> TickOutcome {
    let root = input.project_root.as_path();

    match ralph_config::load_state(root) {
        Ok(LoopState::Running) | Ok(LoopState::Draining) => {
            if let Err(e) = ralph_config::transition_state(root, LoopState::Stopped) {
                tracing::warn!(error = %e, "Failed to transition state to stopped");
            }
        }
        _ => {}
    }

    let cache = StopReasonCache {
        reason: reason.as_str().to_string(),
        summary: summary.clone(),
        project_path: root.to_string_lossy().to_string(),
        session_id: input.session_id.clone(),
        recorded_at: input.now,
        audit: audit.clone(),
    };
    if let Err(e) = ralph_config::write_stop_reason(&input.home_claude, &cache) {
        tracing::warn!(error = %e, "Failed to write stop-reason cache");
    }

    if let Some(mut record) = session {
        record.stop_history.push(reason.as_str().to_string());
        if let Err(e) = ralph_session::save_session(root, &record) {
            tracing::warn!(error = %e, "Failed to persist session on stop");
        }
    }

    TickOutcome {
        decision: LoopDecision::Stop { reason, summary },
        audit,
    }
}

/// A stop that never reached session bookkeeping (`not_applicable`).
/// Deliberately does not touch the global stop-reason cache: a hook
/// firing in an unrelated project would otherwise overwrite the reason
/// the user actually cares about.
fn stop_without_session(reason: StopReason, summary: String) -> TickOutcome {
    TickOutcome {
        decision: LoopDecision::Stop { reason, summary },
        audit: DecisionAudit::default(),
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
