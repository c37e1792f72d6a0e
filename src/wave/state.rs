//! Wave and target state definitions
//!
//! `TargetState` is the outreach state machine:
//! COLD → PROOF_SENT → FOLLOW_UP_1 → FOLLOW_UP_2, branching to
//! REPLY_RECEIVED → MEETING_SCHEDULED → QUALIFIED on engagement, or to the
//! terminal KILLED/NURTURE dispositions on an operator decision. Transition
//! legality lives on the enum so illegal moves are typed errors, not typos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::audit::HistoryEntry;
use crate::clock::days_since;
use crate::leads::{LeadScore, LeadSnapshot, LeadTier};

use super::cadence::CadencePlan;

/// Fixed wave length: six weeks
pub const WAVE_LENGTH_DAYS: i64 = 42;

/// Per-target outreach state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Cold,
    ProofSent,
    #[serde(rename = "follow_up_1")]
    FollowUp1,
    #[serde(rename = "follow_up_2")]
    FollowUp2,
    ReplyReceived,
    MeetingScheduled,
    Qualified,
    Killed,
    Nurture,
}

impl TargetState {
    /// KILLED and NURTURE admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Killed | Self::Nurture)
    }

    /// Next state after an outbound touch; caps at FOLLOW_UP_2 and never
    /// wraps. `None` means the state does not accept touches.
    pub fn advance_touch(self) -> Option<Self> {
        match self {
            Self::Cold => Some(Self::ProofSent),
            Self::ProofSent => Some(Self::FollowUp1),
            Self::FollowUp1 => Some(Self::FollowUp2),
            Self::FollowUp2 => Some(Self::FollowUp2),
            _ => None,
        }
    }

    /// A reply lands from any non-terminal state
    pub fn accepts_reply(self) -> bool {
        !self.is_terminal()
    }

    /// A meeting is scheduled from REPLY_RECEIVED or later
    pub fn accepts_meeting(self) -> bool {
        matches!(
            self,
            Self::ReplyReceived | Self::MeetingScheduled | Self::Qualified
        )
    }

    /// States sitting in the touch cadence, waiting on a reply
    pub fn in_touch_cadence(self) -> bool {
        matches!(self, Self::ProofSent | Self::FollowUp1 | Self::FollowUp2)
    }

    /// States eligible for a kill/keep decision (given the other gates)
    pub fn decision_eligible(self) -> bool {
        matches!(
            self,
            Self::Cold | Self::ProofSent | Self::FollowUp1 | Self::FollowUp2
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cold => "cold",
            Self::ProofSent => "proof_sent",
            Self::FollowUp1 => "follow_up_1",
            Self::FollowUp2 => "follow_up_2",
            Self::ReplyReceived => "reply_received",
            Self::MeetingScheduled => "meeting_scheduled",
            Self::Qualified => "qualified",
            Self::Killed => "killed",
            Self::Nurture => "nurture",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One prospect's outreach progress inside a single wave
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub lead_id: String,
    pub firm_name: String,
    pub tier: LeadTier,
    pub score: u32,
    pub state: TargetState,
    pub touch_count: u32,
    pub last_touch_date: Option<DateTime<Utc>>,
    pub expected_reply_date: Option<DateTime<Utc>>,
    pub reply_date: Option<DateTime<Utc>>,
    pub meeting_date: Option<DateTime<Utc>>,
    pub killed: bool,
    pub history: Vec<HistoryEntry>,
}

impl Target {
    /// Snapshot a lead into a COLD target
    pub fn from_lead(lead: &LeadSnapshot, score: LeadScore, now: DateTime<Utc>) -> Self {
        Self {
            lead_id: lead.lead_id.clone(),
            firm_name: lead.firm_name.clone(),
            tier: score.tier,
            score: score.score,
            state: TargetState::Cold,
            touch_count: 0,
            last_touch_date: None,
            expected_reply_date: None,
            reply_date: None,
            meeting_date: None,
            killed: false,
            history: vec![HistoryEntry::new(
                now,
                "snapshotted",
                Some(format!("tier {} score {}", score.tier, score.score)),
            )],
        }
    }

    /// Append a history entry
    pub fn record(&mut self, now: DateTime<Utc>, event: &str, detail: Option<String>) {
        self.history.push(HistoryEntry::new(now, event, detail));
    }

    /// Whole days past the expected reply date (negative while the reply
    /// window is still open). Zero outside the touch cadence or before the
    /// first touch.
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        if !self.state.in_touch_cadence() {
            return 0;
        }
        self.expected_reply_date
            .map(|expected| days_since(now, expected))
            .unwrap_or(0)
    }
}

/// Wave lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    Active,
    Completed,
    Archived,
}

impl WaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for WaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregated target counts, recomputed after every mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveStats {
    pub targets: usize,
    pub touched: usize,
    pub replies: usize,
    pub meetings: usize,
    pub qualified: usize,
    pub killed: usize,
    pub nurture: usize,
}

impl WaveStats {
    /// Derive stats from the target list
    pub fn recompute(targets: &[Target]) -> Self {
        Self {
            targets: targets.len(),
            touched: targets.iter().filter(|t| t.touch_count > 0).count(),
            replies: targets.iter().filter(|t| t.reply_date.is_some()).count(),
            meetings: targets.iter().filter(|t| t.meeting_date.is_some()).count(),
            qualified: targets
                .iter()
                .filter(|t| t.state == TargetState::Qualified)
                .count(),
            killed: targets
                .iter()
                .filter(|t| t.state == TargetState::Killed)
                .count(),
            nurture: targets
                .iter()
                .filter(|t| t.state == TargetState::Nurture)
                .count(),
        }
    }
}

/// A time-boxed outreach cohort sharing a persona-driven cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    pub id: String,
    pub name: String,
    pub persona: String,
    pub status: WaveStatus,
    pub start_date: DateTime<Utc>,
    /// Fixed at creation: start date plus six weeks
    pub end_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub cadence: CadencePlan,
    pub targets: Vec<Target>,
    pub stats: WaveStats,
}

impl Wave {
    /// Create an active wave; the end date is fixed here and never moves
    pub fn new(
        name: &str,
        persona: &str,
        start_date: DateTime<Utc>,
        cadence: CadencePlan,
        targets: Vec<Target>,
        now: DateTime<Utc>,
    ) -> Self {
        let stats = WaveStats::recompute(&targets);
        Self {
            id: format!("wave-{}", Uuid::new_v4()),
            name: name.to_string(),
            persona: persona.to_string(),
            status: WaveStatus::Active,
            start_date,
            end_date: start_date + chrono::Duration::days(WAVE_LENGTH_DAYS),
            created_at: now,
            cadence,
            targets,
            stats,
        }
    }

    /// Find a target by lead id
    pub fn target(&self, lead_id: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.lead_id == lead_id)
    }

    /// Find a target by lead id, mutably
    pub fn target_mut(&mut self, lead_id: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.lead_id == lead_id)
    }

    /// Recompute aggregated stats from the current targets
    pub fn refresh_stats(&mut self) {
        self.stats = WaveStats::recompute(&self.targets);
    }
}
