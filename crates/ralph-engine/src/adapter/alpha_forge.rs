//! The alpha-forge adapter: convergence heuristics over backtest run
//! summaries.
//!
//! Reads `outputs/runs/*/summary.json` and judges whether another
//! iteration is worth it. Rules, in order:
//!
//! 1. walk-forward efficiency below 0.5 → stop, `overfit`
//! 2. Sharpe up more than 10% since the previous run → `improving`
//! 3. Sharpe up less than 5% for two runs in a row → `pivot`
//!    (keep going, but rotate what the agent works on)
//! 4. otherwise → `patience`
//!
//! Anything missing or malformed is `no_data`, never a stop.

use super::Adapter;
use chrono::{DateTime, Utc};
use ralph_core::{AdapterMetrics, AdapterVerdict};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const ADAPTER_NAME: &str = "alpha-forge";

/// Marker subdirectories that identify an alpha-forge project.
const MARKERS: &[&str] = &["alpha_forge_core", "outputs/runs"];

/// How many recent summaries the heuristics need (pivot looks two deltas
/// back).
const SUMMARY_DEPTH: usize = 3;

pub struct AlphaForge;

/// One run's `summary.json`, parsed leniently; the file belongs to the
/// external pipeline, not to us.
#[derive(Debug, Clone, Default, Deserialize)]
struct RunSummary {
    #[serde(default, alias = "sharpe_ratio")]
    sharpe: Option<f64>,

    #[serde(default, alias = "walk_forward_efficiency")]
    wfe: Option<f64>,

    #[serde(default, alias = "max_drawdown")]
    drawdown: Option<f64>,
}

impl Adapter for AlphaForge {
    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }

    fn matches(&self, project_root: &Path) -> bool {
        MARKERS.iter().any(|m| project_root.join(m).is_dir())
    }

    fn verdict(&self, project_root: &Path, now: DateTime<Utc>) -> AdapterVerdict {
        let summaries = recent_summaries(project_root);
        let Some(latest) = summaries.last() else {
            return no_data(now, "no run summaries found");
        };

        if latest.sharpe.is_none() && latest.wfe.is_none() {
            return no_data(now, "latest summary carries no metrics");
        }

        let metrics = AdapterMetrics {
            sharpe: latest.sharpe,
            wfe: latest.wfe,
            drawdown: latest.drawdown,
        };

        if let Some(wfe) = latest.wfe {
            if wfe < 0.5 {
                return AdapterVerdict {
                    adapter_name: ADAPTER_NAME.to_string(),
                    should_continue: false,
                    reason: "overfit".to_string(),
                    metrics,
                    computed_at: now,
                };
            }
        }

        let reason = match sharpe_deltas(&summaries) {
            deltas if deltas.last().is_some_and(|d| *d > 0.10) => "improving",
            deltas if deltas.len() >= 2 && deltas.iter().rev().take(2).all(|d| *d < 0.05) => {
                "pivot"
            }
            _ => "patience",
        };

        AdapterVerdict {
            adapter_name: ADAPTER_NAME.to_string(),
            should_continue: true,
            reason: reason.to_string(),
            metrics,
            computed_at: now,
        }
    }
}

fn no_data(now: DateTime<Utc>, detail: &str) -> AdapterVerdict {
    tracing::debug!(adapter = ADAPTER_NAME, detail, "Adapter has no data");
    AdapterVerdict {
        adapter_name: ADAPTER_NAME.to_string(),
        should_continue: true,
        reason: "no_data".to_string(),
        metrics: AdapterMetrics::default(),
        computed_at: now,
    }
}

/// Relative Sharpe improvements between consecutive summaries, oldest
/// delta first. Pairs with a missing Sharpe contribute nothing.
fn sharpe_deltas(summaries: &[RunSummary]) -> Vec<f64> {
    summaries
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].sharpe?;
            let latest = pair[1].sharpe?;
            if prev.abs() < f64::EPSILON {
                return None;
            }
            Some((latest - prev) / prev.abs())
        })
        .collect()
}

/// The newest summaries, oldest first. Order: file modification time,
/// run-directory name as tie-break. Unreadable summaries are skipped.
fn recent_summaries(project_root: &Path) -> Vec<RunSummary> {
    let pattern = project_root
        .join("outputs/runs/*/summary.json")
        .to_string_lossy()
        .into_owned();

    let mut dated: Vec<(SystemTime, PathBuf)> = match glob::glob(&pattern) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .filter_map(|path| {
                let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Bad glob pattern for run summaries");
            return Vec::new();
        }
    };
    dated.sort();

    dated
        .into_iter()
        .rev()
        .take(SUMMARY_DEPTH)
        .rev()
        .filter_map(|(_, path)| {
            let content = std::fs::read_to_string(&path).ok()?;
            match serde_json::from_str::<RunSummary>(&content) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping malformed run summary"
                    );
                    None
                }
            }
        })
        .collect()
}
