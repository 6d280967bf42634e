//! Management surfaces: start, stop, status, guidance, constraint acks.
//!
//! These mutate Config only through the ralph-config mutators, so every
//! write is atomic, validated, and rollback-protected.

use crate::cli::Preset;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use ralph_config::{Config, GlobalStop, LoopState};
use std::path::Path;

pub fn handle_start(
    project_root: &Path,
    home_claude: &Path,
    preset: Preset,
    focus: Vec<String>,
    no_focus: bool,
) -> Result<()> {
    let state = ralph_config::load_state(project_root)?;
    match state {
        LoopState::Running => bail!("Loop is already running in this project"),
        LoopState::Draining => bail!("Loop is draining; wait for it to stop or run `ralph stop`"),
        LoopState::Stopped => {}
    }

    let mut config = match preset {
        Preset::Poc => Config::poc(),
        Preset::Production => Config::production(),
    };
    config.no_focus = no_focus;
    if !no_focus {
        config.focus_files = focus;
    }

    // Guidance and scan results survive restarts: only limits and mode
    // flags are reset by a new start.
    if let Some(existing) = Config::load(project_root)? {
        config.guidance = existing.guidance;
        config.constraint_scan = existing.constraint_scan;
    }
    config.save(project_root)?;

    ralph_config::clear_kill_switch(project_root)?;

    // A stale global stop would kill the new loop on its first tick.
    if let Some(signal) = ralph_config::read_global_stop(home_claude)? {
        if signal.timestamp <= Utc::now() {
            ralph_config::clear_global_stop(home_claude)?;
        }
    }

    ralph_config::transition_state(project_root, LoopState::Running)?;

    println!(
        "Loop started ({} preset): up to {} iterations / {:.2}h",
        match preset {
            Preset::Poc => "poc",
            Preset::Production => "production",
        },
        config.loop_limits.max_iterations,
        config.loop_limits.max_hours,
    );
    if let Some(focus) = config.focus_files.first() {
        println!("Focus file: {focus}");
    }
    Ok(())
}

pub fn handle_stop(project_root: &Path, home_claude: &Path, global: bool) -> Result<()> {
    if global {
        ralph_config::write_global_stop(home_claude, &GlobalStop::at(Utc::now()))?;
        println!("Global stop signal set; every loop stops on its next tick.");
        return Ok(());
    }

    match ralph_config::load_state(project_root)? {
        LoopState::Stopped => {
            println!("Loop is not running.");
        }
        LoopState::Draining => {
            println!("Loop is already draining.");
        }
        LoopState::Running => {
            ralph_config::transition_state(project_root, LoopState::Draining)?;
            // Without a live session there is no next tick to finalize the
            // drain; settle to stopped here.
            if ralph_session::newest_session(project_root)?.is_none() {
                ralph_config::transition_state(project_root, LoopState::Stopped)?;
                println!("Loop stopped.");
            } else {
                println!("Loop draining; the next hook tick finalizes the stop.");
            }
        }
    }
    Ok(())
}

pub fn handle_status(project_root: &Path, home_claude: &Path) -> Result<()> {
    let state = ralph_config::load_state(project_root)?;
    println!("State: {state}");

    if ralph_config::kill_switch_present(project_root) {
        println!("Kill switch: present (.claude/STOP_LOOP)");
    }

    match Config::load(project_root) {
        Ok(Some(config)) => {
            let limits = &config.loop_limits;
            println!(
                "Limits: {}..{} iterations, {:.2}h..{:.2}h",
                limits.min_iterations, limits.max_iterations, limits.min_hours, limits.max_hours
            );
            if !config.guidance.forbidden.is_empty() {
                println!("Forbidden: {}", config.guidance.forbidden.join("; "));
            }
            if !config.guidance.encouraged.is_empty() {
                println!("Encouraged: {}", config.guidance.encouraged.join("; "));
            }
        }
        Ok(None) => println!("No loop config in this project (run `ralph start`)."),
        Err(e) => println!("Config unreadable: {e:#}"),
    }

    if let Some(session) = ralph_session::newest_session(project_root)? {
        println!(
            "Last session {}: iteration {}, runtime {:.2}h, idle streak {}",
            session.session_id,
            session.iteration_count,
            session.runtime_hours(),
            session.idle_streak,
        );
        if let Some(focus) = session.focus_file() {
            println!("Focus file: {focus}");
        }
        if let Some(verdict) = &session.last_adapter_verdict {
            println!(
                "Adapter {}: {} (continue: {})",
                verdict.adapter_name, verdict.reason, verdict.should_continue
            );
        }
    }

    if let Some(cache) = ralph_config::read_stop_reason(home_claude)? {
        println!(
            "Last stop: {} at {} ({})",
            cache.reason,
            cache.recorded_at.to_rfc3339(),
            cache.summary
        );
    }

    if ralph_config::read_global_stop(home_claude)?.is_some() {
        println!("Global stop signal is SET (clear with `ralph start`).");
    }

    Ok(())
}

pub fn handle_encourage(project_root: &Path, text: &str, remove: bool) -> Result<()> {
    mutate_guidance(project_root, |config, now| {
        if remove {
            config.guidance.remove_encouraged(text, now)
        } else {
            config.guidance.add_encouraged(text, now)
        }
    })?;
    println!(
        "{} encouraged: {text}",
        if remove { "Removed" } else { "Added" }
    );
    Ok(())
}

pub fn handle_forbid(project_root: &Path, text: &str, remove: bool) -> Result<()> {
    mutate_guidance(project_root, |config, now| {
        if remove {
            config.guidance.remove_forbidden(text, now)
        } else {
            config.guidance.add_forbidden(text, now)
        }
    })?;
    println!(
        "{} forbidden: {text}",
        if remove { "Removed" } else { "Added" }
    );
    Ok(())
}

pub fn handle_ack_constraint(project_root: &Path, id: &str) -> Result<()> {
    let mut config = Config::load(project_root)?
        .context("No loop config in this project (run `ralph start` first)")?;

    let constraint = ralph_config::constraints_from_scan(&config)
        .into_iter()
        .find(|c| c.id == id)
        .with_context(|| format!("No constraint with id '{id}' in the scan results"))?;

    let already = ralph_config::load_acked_ids(project_root)?.contains(id);
    if already {
        println!("Constraint {id} was already acknowledged.");
        return Ok(());
    }

    ralph_config::append_ack(
        project_root,
        &ralph_config::AckRecord {
            id: id.to_string(),
            acknowledged_at: Utc::now(),
        },
    )?;

    // The recommendation becomes a standing prohibition.
    let phrase = if constraint.recommendation.is_empty() {
        constraint.description.clone()
    } else {
        constraint.recommendation.clone()
    };
    if !phrase.is_empty() {
        config.guidance.add_forbidden(&phrase, Utc::now());
        config.save(project_root)?;
    }

    println!("Acknowledged {id}; it will no longer appear in prompts.");
    Ok(())
}

fn mutate_guidance(
    project_root: &Path,
    mutate: impl FnOnce(&mut Config, chrono::DateTime<Utc>) -> bool,
) -> Result<()> {
    let mut config = Config::load(project_root)?
        .context("No loop config in this project (run `ralph start` first)")?;
    mutate(&mut config, Utc::now());
    config.save(project_root)?;
    Ok(())
}

#[cfg(test)]
#[path = "loop_cmds_tests.rs"]
mod tests;
