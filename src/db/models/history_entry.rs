//! History data models.
//!
//! Field names are part of the export format and must stay exactly
//! `id`, `word`, `sentence`, `explanation`, `timestamp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::helpers::datetime_from_millis;

/// One stored explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub sentence: String,
    #[serde(default)]
    pub explanation: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

impl HistoryEntry {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        datetime_from_millis(self.timestamp, "timestamp").ok()
    }

    /// First line of the explanation, shown as the entry title in lists.
    pub fn headline(&self) -> &str {
        self.explanation.lines().next().unwrap_or("").trim()
    }

    /// Everything after the headline.
    pub fn details(&self) -> &str {
        match self.explanation.split_once('\n') {
            Some((_, rest)) => rest.trim(),
            None => "",
        }
    }
}

/// Fields to overwrite on an existing entry. `None` leaves the stored value untouched.
///
/// The id is the row key and cannot be patched; an `id` key in serialized input is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl HistoryEntryPatch {
    pub fn is_empty(&self) -> bool {
        self.word.is_none()
            && self.sentence.is_none()
            && self.explanation.is_none()
            && self.timestamp.is_none()
    }

    /// Shallow merge: every present field replaces the entry's value.
    pub fn apply_to(self, entry: &mut HistoryEntry) {
        if let Some(word) = self.word {
            entry.word = word;
        }
        if let Some(sentence) = self.sentence {
            entry.sentence = sentence;
        }
        if let Some(explanation) = self.explanation {
            entry.explanation = explanation;
        }
        if let Some(timestamp) = self.timestamp {
            entry.timestamp = timestamp;
        }
    }
}
