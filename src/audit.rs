//! Append-only audit history shared by engine entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One history entry. Entries are appended in wall-clock order and are never
/// reordered or removed once persisted; derived fields (touch counts, cycle
/// times) trace back to this trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HistoryEntry {
    /// Create a new history entry
    pub fn new(at: DateTime<Utc>, event: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            at,
            event: event.into(),
            detail,
        }
    }
}
