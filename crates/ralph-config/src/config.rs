//! The per-project config document (`.claude/ralph-config.json`).
//!
//! Loaded fresh on every hook tick, so guidance edits take effect on the
//! next turn without restarting anything. All writes are atomic with a
//! one-slot backup; a write that fails post-write validation is rolled
//! back to the last-known-good document.

use crate::guidance::Guidance;
use crate::{io, paths};
use anyhow::{Context, Result};
use ralph_core::RalphError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Schema version written by this build.
pub const SCHEMA_VERSION: &str = "3.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version (semver). Unknown newer fields are preserved on
    /// round-trip via the flattened catch-all below.
    pub version: String,

    #[serde(default)]
    pub poc_mode: bool,

    #[serde(default)]
    pub production_mode: bool,

    /// Start in exploration with no focus file.
    #[serde(default)]
    pub no_focus: bool,

    /// Focus files supplied at start; copied into new session records.
    #[serde(default)]
    pub focus_files: Vec<String>,

    #[serde(default)]
    pub loop_limits: LoopLimits,

    #[serde(default)]
    pub loop_detection: LoopDetection,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub protection: ProtectionConfig,

    #[serde(default)]
    pub guidance: Guidance,

    /// Opaque preflight-scan payload, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_scan: Option<serde_json::Value>,

    /// Fields this build does not know about. Kept so an older binary
    /// never strips a newer schema's data.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopLimits {
    #[serde(default = "default_min_hours")]
    pub min_hours: f64,

    #[serde(default = "default_max_hours")]
    pub max_hours: f64,

    #[serde(default = "default_min_iterations")]
    pub min_iterations: u32,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_min_hours() -> f64 {
    4.0
}

fn default_max_hours() -> f64 {
    8.0
}

fn default_min_iterations() -> u32 {
    50
}

fn default_max_iterations() -> u32 {
    200
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            min_hours: default_min_hours(),
            max_hours: default_max_hours(),
            min_iterations: default_min_iterations(),
            max_iterations: default_max_iterations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDetection {
    /// Similarity at or above this counts as a repeat.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// How many recent output fingerprints to retain.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_similarity_threshold() -> f64 {
    0.90
}

fn default_window_size() -> usize {
    5
}

impl Default for LoopDetection {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            window_size: default_window_size(),
        }
    }
}

/// Completion rubric weights. Exposed in config for tuning; the engine
/// treats these values as the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    #[serde(default = "default_explicit_marker_confidence")]
    pub explicit_marker_confidence: f64,

    #[serde(default = "default_frontmatter_confidence")]
    pub frontmatter_confidence: f64,

    #[serde(default = "default_all_checked_confidence")]
    pub all_checked_confidence: f64,

    #[serde(default = "default_no_unchecked_confidence")]
    pub no_unchecked_confidence: f64,

    #[serde(default = "default_phrase_confidence")]
    pub phrase_confidence: f64,

    #[serde(default = "default_completion_phrases")]
    pub completion_phrases: Vec<String>,
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_explicit_marker_confidence() -> f64 {
    1.0
}

fn default_frontmatter_confidence() -> f64 {
    0.95
}

fn default_all_checked_confidence() -> f64 {
    0.9
}

fn default_no_unchecked_confidence() -> f64 {
    0.85
}

fn default_phrase_confidence() -> f64 {
    0.7
}

fn default_completion_phrases() -> Vec<String> {
    vec![
        "task complete".to_string(),
        "all done".to_string(),
        "finished".to_string(),
    ]
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            explicit_marker_confidence: default_explicit_marker_confidence(),
            frontmatter_confidence: default_frontmatter_confidence(),
            all_checked_confidence: default_all_checked_confidence(),
            no_unchecked_confidence: default_no_unchecked_confidence(),
            phrase_confidence: default_phrase_confidence(),
            completion_phrases: default_completion_phrases(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionConfig {
    /// Paths (relative to project root) the PreToolUse guard defends.
    /// The config and state files are always protected even if this list
    /// is edited down; see `effective_protected_files`.
    #[serde(default = "default_protected_files")]
    pub protected_files: Vec<String>,

    /// Markers whose presence in a command body bypasses the guard.
    #[serde(default = "default_bypass_markers")]
    pub bypass_markers: Vec<String>,
}

fn default_protected_files() -> Vec<String> {
    vec![
        ".claude/ralph-config.json".to_string(),
        ".claude/ralph-state.json".to_string(),
        ".claude/ralph-sessions".to_string(),
    ]
}

fn default_bypass_markers() -> Vec<String> {
    vec!["RALPH_STOP_SCRIPT".to_string(), "RALPH_START_SCRIPT".to_string()]
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            protected_files: default_protected_files(),
            bypass_markers: default_bypass_markers(),
        }
    }
}

impl ProtectionConfig {
    /// Protected paths with the non-negotiable entries merged back in.
    pub fn effective_protected_files(&self) -> Vec<String> {
        let mut files = self.protected_files.clone();
        for builtin in default_protected_files() {
            if !files.iter().any(|f| f == &builtin) {
                files.push(builtin);
            }
        }
        files
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            poc_mode: false,
            production_mode: true,
            no_focus: false,
            focus_files: Vec::new(),
            loop_limits: LoopLimits::default(),
            loop_detection: LoopDetection::default(),
            completion: CompletionConfig::default(),
            protection: ProtectionConfig::default(),
            guidance: Guidance::default(),
            constraint_scan: None,
            extra: serde_json::Map::new(),
        }
    }
}

impl Config {
    /// Production preset: long minima, generous maxima.
    pub fn production() -> Self {
        Self::default()
    }

    /// POC preset: five-minute minimum, ten-minute maximum, 10..20 ticks.
    pub fn poc() -> Self {
        Self {
            poc_mode: true,
            production_mode: false,
            loop_limits: LoopLimits {
                min_hours: 0.083,
                max_hours: 0.167,
                min_iterations: 10,
                max_iterations: 20,
            },
            ..Self::default()
        }
    }

    /// Check the document invariants. Called after every load and around
    /// every save.
    pub fn validate(&self) -> Result<(), RalphError> {
        let invalid = |reason: String| RalphError::ConfigInvalid {
            path: paths::CONFIG_FILE_NAME.to_string(),
            reason,
        };

        let parts: Vec<&str> = self.version.split('.').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.parse::<u32>().is_err()) {
            return Err(invalid(format!("version '{}' is not semver", self.version)));
        }

        let limits = &self.loop_limits;
        if !(limits.min_hours > 0.0) {
            return Err(invalid("min_hours must be > 0".into()));
        }
        if limits.min_hours > limits.max_hours {
            return Err(invalid(format!(
                "min_hours {} exceeds max_hours {}",
                limits.min_hours, limits.max_hours
            )));
        }
        if limits.min_iterations == 0 {
            return Err(invalid("min_iterations must be > 0".into()));
        }
        if limits.min_iterations > limits.max_iterations {
            return Err(invalid(format!(
                "min_iterations {} exceeds max_iterations {}",
                limits.min_iterations, limits.max_iterations
            )));
        }

        let detection = &self.loop_detection;
        if !(detection.similarity_threshold > 0.0 && detection.similarity_threshold <= 1.0) {
            return Err(invalid(format!(
                "similarity_threshold {} outside (0, 1]",
                detection.similarity_threshold
            )));
        }
        if detection.window_size < 2 {
            return Err(invalid("window_size must be at least 2".into()));
        }

        let completion = &self.completion;
        for (name, value) in [
            ("confidence_threshold", completion.confidence_threshold),
            (
                "explicit_marker_confidence",
                completion.explicit_marker_confidence,
            ),
            ("frontmatter_confidence", completion.frontmatter_confidence),
            ("all_checked_confidence", completion.all_checked_confidence),
            ("no_unchecked_confidence", completion.no_unchecked_confidence),
            ("phrase_confidence", completion.phrase_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!("{name} {value} outside [0, 1]")));
            }
        }

        Ok(())
    }

    /// Load the config for a project. Returns `None` when the project has
    /// no config (loop never started here).
    ///
    /// A document that fails to parse or validate is restored from the
    /// one-slot backup; without a usable backup this is fatal.
    pub fn load(project_root: &Path) -> Result<Option<Self>> {
        let path = paths::config_path(project_root);
        let Some(content) = io::read_with_retry(&path)? else {
            return Ok(None);
        };

        match Self::parse_and_validate(&content) {
            Ok(config) => Ok(Some(config)),
            Err(parse_err) => Self::restore_from_backup(project_root, &parse_err).map(Some),
        }
    }

    /// Save atomically with backup + post-write validation.
    ///
    /// Order matters: the current good document is copied to the backup
    /// slot first, so a bad write can always be rolled back within the
    /// same invocation.
    pub fn save(&self, project_root: &Path) -> Result<()> {
        self.validate()?;

        let path = paths::config_path(project_root);
        let backup_path = paths::config_backup_path(project_root);

        if let Some(existing) = io::read_with_retry(&path)? {
            if Self::parse_and_validate(&existing).is_ok() {
                if let Some(parent) = backup_path.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create directory: {}", parent.display())
                    })?;
                }
                fs::write(&backup_path, existing).with_context(|| {
                    format!("Failed to write config backup: {}", backup_path.display())
                })?;
            }
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        io::write_atomic(&path, &content)?;

        // Post-write validation: re-read what landed on disk.
        let written = io::read_with_retry(&path)?
            .ok_or_else(|| RalphError::ConfigNotFound(path.display().to_string()))?;
        if let Err(e) = Self::parse_and_validate(&written) {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Config failed post-write validation, rolling back"
            );
            if backup_path.exists() {
                fs::copy(&backup_path, &path).with_context(|| {
                    format!("Failed to roll back config from {}", backup_path.display())
                })?;
                anyhow::bail!("Config write failed validation; previous document restored");
            }
            return Err(RalphError::ConfigUnrecoverable {
                path: path.display().to_string(),
            }
            .into());
        }

        Ok(())
    }

    fn parse_and_validate(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn restore_from_backup(project_root: &Path, source_err: &anyhow::Error) -> Result<Self> {
        let path = paths::config_path(project_root);
        let backup_path = paths::config_backup_path(project_root);

        let backup = io::read_with_retry(&backup_path)?
            .and_then(|content| Self::parse_and_validate(&content).ok());

        match backup {
            Some(config) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %source_err,
                    "Config corrupt; restored from backup"
                );
                fs::copy(&backup_path, &path).with_context(|| {
                    format!("Failed to restore config from {}", backup_path.display())
                })?;
                Ok(config)
            }
            None => {
                tracing::error!(
                    path = %path.display(),
                    error = %source_err,
                    "Config corrupt and no usable backup exists"
                );
                Err(RalphError::ConfigUnrecoverable {
                    path: path.display().to_string(),
                }
                .into())
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
