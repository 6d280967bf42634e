//! Project adapters: pluggable convergence advisors.
//!
//! An adapter declares a pure `matches` predicate over the project path
//! and a pure `verdict` function over external artifacts. Verdicts are
//! advisory: the engine composes them with budget minima and never lets
//! an adapter stop a loop that has not met its minima.

pub mod alpha_forge;

use chrono::{DateTime, Utc};
use ralph_core::AdapterVerdict;
use std::path::Path;

pub use alpha_forge::AlphaForge;

pub trait Adapter {
    fn name(&self) -> &'static str;

    /// Whether this adapter recognises the project.
    fn matches(&self, project_root: &Path) -> bool;

    /// Compute a verdict from on-disk artifacts. Must not fail: missing or
    /// malformed artifacts yield a `no_data` continue.
    fn verdict(&self, project_root: &Path, now: DateTime<Utc>) -> AdapterVerdict;
}

/// All known adapters, in priority order.
fn registry() -> Vec<Box<dyn Adapter>> {
    vec![Box::new(AlphaForge)]
}

/// The first adapter recognising the project, if any.
pub fn select(project_root: &Path) -> Option<Box<dyn Adapter>> {
    registry().into_iter().find(|a| a.matches(project_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_select_none_for_unrecognised_project() {
        let dir = tempdir().unwrap();
        assert!(select(dir.path()).is_none());
    }

    #[test]
    fn test_select_alpha_forge_by_runs_dir() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("outputs/runs")).unwrap();
        let adapter = select(dir.path()).unwrap();
        assert_eq!(adapter.name(), "alpha-forge");
    }
}
