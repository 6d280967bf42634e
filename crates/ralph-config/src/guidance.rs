//! Mutable guidance lists: what the user has forbidden or encouraged.
//!
//! Every mutation refreshes the timestamp, even a no-op append of a phrase
//! already present. The timestamp is the freshness signal the prompt
//! composer uses to tell the agent "guidance updated at <ts>".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guidance {
    /// User-forbidden activities; matched as case-insensitive substrings.
    #[serde(default)]
    pub forbidden: Vec<String>,

    /// User-encouraged activities; an encouraged match overrides a
    /// forbidden one.
    #[serde(default)]
    pub encouraged: Vec<String>,

    /// When either list last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Guidance {
    /// Append to `forbidden`, deduplicating by case-folded equality.
    /// Returns whether the phrase was newly added.
    pub fn add_forbidden(&mut self, phrase: &str, now: DateTime<Utc>) -> bool {
        let added = Self::push_unique(&mut self.forbidden, phrase);
        self.timestamp = Some(now);
        added
    }

    /// Append to `encouraged`, deduplicating by case-folded equality.
    /// Returns whether the phrase was newly added.
    pub fn add_encouraged(&mut self, phrase: &str, now: DateTime<Utc>) -> bool {
        let added = Self::push_unique(&mut self.encouraged, phrase);
        self.timestamp = Some(now);
        added
    }

    /// Remove from `forbidden` by case-folded equality.
    pub fn remove_forbidden(&mut self, phrase: &str, now: DateTime<Utc>) -> bool {
        let removed = Self::remove_matching(&mut self.forbidden, phrase);
        if removed {
            self.timestamp = Some(now);
        }
        removed
    }

    /// Remove from `encouraged` by case-folded equality.
    pub fn remove_encouraged(&mut self, phrase: &str, now: DateTime<Utc>) -> bool {
        let removed = Self::remove_matching(&mut self.encouraged, phrase);
        if removed {
            self.timestamp = Some(now);
        }
        removed
    }

    fn push_unique(list: &mut Vec<String>, phrase: &str) -> bool {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return false;
        }
        let folded = phrase.to_lowercase();
        if list.iter().any(|p| p.to_lowercase() == folded) {
            return false;
        }
        list.push(phrase.to_string());
        true
    }

    fn remove_matching(list: &mut Vec<String>, phrase: &str) -> bool {
        let folded = phrase.trim().to_lowercase();
        let before = list.len();
        list.retain(|p| p.to_lowercase() != folded);
        list.len() != before
    }
}
