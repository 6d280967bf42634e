//! Constraint acknowledgements.
//!
//! A preflight scan (external) can leave findings in the config's
//! `constraint_scan` payload. When the user acknowledges one (turning its
//! recommendation into a forbidden item) the id is appended to an NDJSON
//! log so the finding stops appearing in future prompts.

use crate::{config::Config, paths};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// One finding from the external preflight scan.
///
/// Parsed leniently out of the opaque `constraint_scan` payload; fields the
/// scan omits default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,

    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub file: String,

    #[serde(default)]
    pub recommendation: String,
}

/// One line of the acknowledgement log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRecord {
    pub id: String,
    pub acknowledged_at: DateTime<Utc>,
}

/// Extract typed constraints from the opaque scan payload.
///
/// Accepts either `{"constraints": [...]}` or a bare array. Entries that
/// fail to parse are skipped, not fatal; the scan format is not ours.
pub fn constraints_from_scan(config: &Config) -> Vec<Constraint> {
    let Some(scan) = &config.constraint_scan else {
        return Vec::new();
    };
    let items = match scan {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => match map.get("constraints") {
            Some(serde_json::Value::Array(items)) => items.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .filter(|c: &Constraint| !c.id.is_empty())
        .collect()
}

/// Append an acknowledgement. The log is append-only NDJSON.
pub fn append_ack(project_root: &Path, record: &AckRecord) -> Result<()> {
    let path = paths::ack_log_path(project_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open ack log: {}", path.display()))?;
    let line = serde_json::to_string(record).context("Failed to serialize ack record")?;
    writeln!(file, "{line}").with_context(|| format!("Failed to append to {}", path.display()))?;
    Ok(())
}

/// Ids already acknowledged. Unparseable lines are skipped with a warning.
pub fn load_acked_ids(project_root: &Path) -> Result<HashSet<String>> {
    let path = paths::ack_log_path(project_root);
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open ack log: {}", path.display()))?;
    let mut ids = HashSet::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| {
            format!("Failed to read line {} of {}", idx + 1, path.display())
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AckRecord>(&line) {
            Ok(record) => {
                ids.insert(record.id);
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = idx + 1,
                    error = %e,
                    "Skipping unparseable ack record"
                );
            }
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_with_scan(scan: serde_json::Value) -> Config {
        Config {
            constraint_scan: Some(scan),
            ..Config::default()
        }
    }

    #[test]
    fn test_constraints_from_wrapped_scan() {
        let config = config_with_scan(serde_json::json!({
            "constraints": [
                {
                    "id": "AF-001",
                    "severity": "high",
                    "description": "lookahead bias in feature window",
                    "file": "features/window.py",
                    "recommendation": "shift the window by one bar"
                },
                {"not_a_constraint": true}
            ]
        }));
        let constraints = constraints_from_scan(&config);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].id, "AF-001");
        assert_eq!(constraints[0].severity, "high");
    }

    #[test]
    fn test_constraints_from_bare_array() {
        let config = config_with_scan(serde_json::json!([
            {"id": "AF-002", "recommendation": "cap position size"}
        ]));
        let constraints = constraints_from_scan(&config);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].recommendation, "cap position size");
    }

    #[test]
    fn test_no_scan_is_empty() {
        assert!(constraints_from_scan(&Config::default()).is_empty());
    }

    #[test]
    fn test_ack_log_roundtrip() {
        let dir = tempdir().unwrap();
        append_ack(
            dir.path(),
            &AckRecord {
                id: "AF-001".into(),
                acknowledged_at: Utc::now(),
            },
        )
        .unwrap();
        append_ack(
            dir.path(),
            &AckRecord {
                id: "AF-002".into(),
                acknowledged_at: Utc::now(),
            },
        )
        .unwrap();

        let ids = load_acked_ids(dir.path()).unwrap();
        assert!(ids.contains("AF-001"));
        assert!(ids.contains("AF-002"));
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_ack_log_skips_garbage_lines() {
        let dir = tempdir().unwrap();
        append_ack(
            dir.path(),
            &AckRecord {
                id: "AF-001".into(),
                acknowledged_at: Utc::now(),
            },
        )
        .unwrap();

        let path = paths::ack_log_path(dir.path());
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "corrupt line").unwrap();

        let ids = load_acked_ids(dir.path()).unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_ack_log_absent_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_acked_ids(dir.path()).unwrap().is_empty());
    }
}
