//! Signal data model and computed SLA state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::audit::HistoryEntry;
use crate::clock::hours_since;

/// Signal priority, ordered most urgent first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Sort rank; lower sorts first
    pub fn rank(self) -> u8 {
        match self {
            Self::Urgent => 0,
            Self::Critical => 1,
            Self::High => 2,
            Self::Medium => 3,
            Self::Low => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Pending,
    Acknowledged,
    InProgress,
    Completed,
    Dismissed,
    Expired,
}

impl SignalStatus {
    /// Terminal statuses admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Dismissed | Self::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Acknowledged => "acknowledged",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Dismissed => "dismissed",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// SLA standing, computed on every read and never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlaState {
    Completed,
    Breached { hours_overdue: i64 },
    Ok { hours_remaining: i64 },
}

impl SlaState {
    pub fn is_breached(&self) -> bool {
        matches!(self, Self::Breached { .. })
    }
}

/// An SLA-bound trigger requiring a specific owner's action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub signal_type: String,
    pub name: String,
    pub lead_id: Option<String>,
    pub firm_name: Option<String>,
    pub source: String,
    pub status: SignalStatus,
    pub owner: String,
    pub action: String,
    pub priority: Priority,
    /// Copied from the type registry at creation; immutable thereafter
    pub sla_hours: i64,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assigned_to: Option<String>,
    pub resolution: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub history: Vec<HistoryEntry>,
}

impl Signal {
    /// SLA standing as of `now`. Breach is monotonic: once the allotted
    /// hours elapse it stays breached until the status turns terminal.
    pub fn sla_state(&self, now: DateTime<Utc>) -> SlaState {
        if self.status.is_terminal() {
            return SlaState::Completed;
        }

        let elapsed = hours_since(now, self.created_at);
        if elapsed >= self.sla_hours {
            SlaState::Breached {
                hours_overdue: elapsed - self.sla_hours,
            }
        } else {
            SlaState::Ok {
                hours_remaining: self.sla_hours - elapsed,
            }
        }
    }

    /// Whole hours since creation
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        hours_since(now, self.created_at)
    }
}
