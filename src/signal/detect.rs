//! Pure rule evaluation over lead/deal snapshots
//!
//! Detection produces candidates only; callers decide whether to materialize
//! each one via `SignalQueue::create_signal`.

use serde::Serialize;

use crate::leads::{LeadSnapshot, LeadTier, RelationshipStatus};

/// Deal value above which a lead is treated as a whale
pub const WHALE_DEAL_VALUE: u64 = 50_000;

/// A detection rule match: type key plus the reason it fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalCandidate {
    pub signal_type: &'static str,
    pub reason: String,
}

/// Evaluate detection rules against a snapshot. No side effects.
pub fn detect_signals(lead: &LeadSnapshot) -> Vec<SignalCandidate> {
    let mut candidates = Vec::new();

    if let Some(value) = lead.deal_value {
        if value > WHALE_DEAL_VALUE {
            candidates.push(SignalCandidate {
                signal_type: "whale_alert",
                reason: format!("deal value ${value} exceeds ${WHALE_DEAL_VALUE}"),
            });
        }
    }

    if lead.relationship == Some(RelationshipStatus::WarmIntro) {
        candidates.push(SignalCandidate {
            signal_type: "warm_intro",
            reason: "warm introduction path is available".to_string(),
        });
    }

    if lead.tier == LeadTier::A && lead.last_touch_date.is_none() {
        candidates.push(SignalCandidate {
            signal_type: "overdue_followup",
            reason: "tier A lead has never been touched".to_string(),
        });
    }

    candidates
}
