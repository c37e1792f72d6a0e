//! External collaborator boundaries
//!
//! Lead scoring, proof matching, and the upstream contact store are black
//! boxes to the engine; this module fixes their interface shape and ships
//! simple in-memory implementations for the CLI and for tests.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Lead priority tier assigned by the scoring heuristics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadTier {
    A,
    B,
    C,
}

impl fmt::Display for LeadTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

/// Relationship standing between the firm and the prospect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStatus {
    Cold,
    WarmIntro,
    Existing,
}

/// Point-in-time snapshot of one lead, as supplied by the contact store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadSnapshot {
    pub lead_id: String,
    pub firm_name: String,
    pub tier: LeadTier,
    pub score: u32,
    #[serde(default)]
    pub deal_value: Option<u64>,
    #[serde(default)]
    pub relationship: Option<RelationshipStatus>,
    #[serde(default)]
    pub last_touch_date: Option<DateTime<Utc>>,
}

/// Output of the lead-scoring black box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScore {
    pub tier: LeadTier,
    pub score: u32,
}

/// Lead-scoring heuristics, consumed as a black box
pub trait LeadScorer: Send + Sync {
    fn score(&self, lead: &LeadSnapshot) -> LeadScore;
}

/// Scorer that trusts the tier and score already on the snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotScorer;

impl LeadScorer for SnapshotScorer {
    fn score(&self, lead: &LeadSnapshot) -> LeadScore {
        LeadScore {
            tier: lead.tier,
            score: lead.score,
        }
    }
}

/// One proof asset suggested for a lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofAsset {
    pub asset_id: String,
    pub title: String,
    pub relevance: f32,
}

/// Proof-matching black box: candidate assets per lead
pub trait ProofMatcher: Send + Sync {
    fn candidate_assets(&self, lead: &LeadSnapshot) -> Vec<ProofAsset>;
}

/// Proof matcher backed by a fixed lead-to-assets table
#[derive(Debug, Default)]
pub struct StaticProofMatcher {
    assets: HashMap<String, Vec<ProofAsset>>,
}

impl StaticProofMatcher {
    /// Register candidate assets for a lead
    pub fn insert(&mut self, lead_id: impl Into<String>, assets: Vec<ProofAsset>) {
        self.assets.insert(lead_id.into(), assets);
    }
}

impl ProofMatcher for StaticProofMatcher {
    fn candidate_assets(&self, lead: &LeadSnapshot) -> Vec<ProofAsset> {
        self.assets.get(&lead.lead_id).cloned().unwrap_or_default()
    }
}

/// Upstream contact store supplying lead snapshots at wave creation
pub trait ContactStore: Send + Sync {
    fn lead(&self, lead_id: &str) -> Option<LeadSnapshot>;
    fn all_leads(&self) -> Vec<LeadSnapshot>;
}

/// In-memory contact store, optionally loaded from a JSON lead export
#[derive(Debug, Default)]
pub struct StaticContactStore {
    leads: HashMap<String, LeadSnapshot>,
}

impl StaticContactStore {
    /// Build a store from lead snapshots
    pub fn new(leads: impl IntoIterator<Item = LeadSnapshot>) -> Self {
        Self {
            leads: leads
                .into_iter()
                .map(|lead| (lead.lead_id.clone(), lead))
                .collect(),
        }
    }

    /// Load a store from a JSON array of lead snapshots
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lead export {}", path.display()))?;
        let leads: Vec<LeadSnapshot> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse lead export {}", path.display()))?;
        Ok(Self::new(leads))
    }

    /// Add or replace a lead snapshot
    pub fn insert(&mut self, lead: LeadSnapshot) {
        self.leads.insert(lead.lead_id.clone(), lead);
    }
}

impl ContactStore for StaticContactStore {
    fn lead(&self, lead_id: &str) -> Option<LeadSnapshot> {
        self.leads.get(lead_id).cloned()
    }

    fn all_leads(&self) -> Vec<LeadSnapshot> {
        let mut leads: Vec<_> = self.leads.values().cloned().collect();
        leads.sort_by(|a, b| a.lead_id.cmp(&b.lead_id));
        leads
    }
}
