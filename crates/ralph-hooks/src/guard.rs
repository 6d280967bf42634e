//! PreToolUse guard: veto destructive shell commands aimed at loop
//! control files.
//!
//! The guard is fail-open. It only ever denies when it positively
//! identifies (a) a destructive operation and (b) a protected file in the
//! same command, with no bypass marker present. Anything it cannot read
//! confidently passes through with a log line; the loop's own config
//! protects the loop, not the whole filesystem.

use ralph_config::ProtectionConfig;
use regex::Regex;
use std::sync::OnceLock;

/// Commands that delete, move, or truncate their target.
const DESTRUCTIVE_OPS: &str = r"\b(rm|unlink|shred|truncate|mv)\b";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Deny { reason: String },
}

impl GuardDecision {
    pub fn is_deny(&self) -> bool {
        matches!(self, GuardDecision::Deny { .. })
    }
}

fn destructive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DESTRUCTIVE_OPS).expect("static regex"))
}

/// Evaluate one proposed shell command.
pub fn evaluate(command: &str, protection: &ProtectionConfig) -> GuardDecision {
    if command.trim().is_empty() {
        return GuardDecision::Allow;
    }

    if protection
        .bypass_markers
        .iter()
        .any(|marker| !marker.is_empty() && command.contains(marker))
    {
        tracing::debug!("Bypass marker present, allowing command");
        return GuardDecision::Allow;
    }

    let destructive = destructive_re().is_match(command);

    for protected in protection.effective_protected_files() {
        let Some(position) = reference_position(command, &protected) else {
            continue;
        };
        if destructive || is_overwrite_target(command, position) {
            return GuardDecision::Deny {
                reason: format!(
                    "Command targets protected loop file '{protected}' with a \
                     destructive operation. Use the official ralph commands to \
                     manage the loop."
                ),
            };
        }
    }

    GuardDecision::Allow
}

/// Where the command references a protected path: the configured relative
/// path, or its final component when the command addresses the file some
/// other way (absolute path, cwd inside `.claude/`).
fn reference_position(command: &str, protected: &str) -> Option<usize> {
    if let Some(idx) = command.find(protected) {
        return Some(idx);
    }
    let basename = protected.rsplit('/').next().unwrap_or(protected);
    if basename.is_empty() || basename == protected {
        return None;
    }
    command.find(basename)
}

/// Whether the reference at `position` sits behind an output redirection
/// (`> file` or `>> file` both rewrite content in place).
fn is_overwrite_target(command: &str, position: usize) -> bool {
    command[..position]
        .trim_end()
        .ends_with('>')
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
