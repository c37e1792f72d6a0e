//! Wave orchestrator: cohort lifecycle and per-target outreach state
//!
//! Owns the waves collection. Touch/reply/meeting recording, the kill/keep
//! queue, and the dashboard all run here; next-action derivation is a pure
//! function of the target snapshot so it can be recomputed anywhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{days_until_ceil, Clock};
use crate::config::EngineConfig;
use crate::effects::Effect;
use crate::error::{EngineError, EngineResult};
use crate::leads::{ContactStore, LeadScorer, LeadTier, ProofAsset, ProofMatcher};
use crate::signal::Priority;
use crate::storage::{JsonCollectionStore, StorageResult};

use super::cadence::{CadencePlan, TouchChannel};
use super::state::{Target, TargetState, Wave, WaveStats, WaveStatus};

/// Schema version of the waves collection document
pub const WAVES_SCHEMA_VERSION: u32 = 1;

/// What the operator should do next for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SendProofMailer,
    SendFollowUp,
    KillKeepDecision,
    WaitForReply,
    ScheduleMeeting,
    PrepareMeeting,
    None,
}

/// Derived next action for a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextAction {
    pub action: ActionKind,
    pub description: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_in_days: Option<i64>,
}

/// Operator disposition for a stalled target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Kill,
    Keep,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kill => write!(f, "kill"),
            Self::Keep => write!(f, "keep"),
        }
    }
}

impl FromStr for Decision {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kill" => Ok(Self::Kill),
            "keep" => Ok(Self::Keep),
            other => Err(EngineError::validation_field(
                "decision",
                format!("decision must be 'kill' or 'keep', got '{other}'"),
            )),
        }
    }
}

/// Mutated target plus its recomputed next action
#[derive(Debug, Clone, Serialize)]
pub struct TargetUpdate {
    pub target: Target,
    pub next_action: NextAction,
}

/// Reply outcome: the update plus effects for the dispatcher
#[derive(Debug, Clone, Serialize)]
pub struct ReplyOutcome {
    pub target: Target,
    pub next_action: NextAction,
    #[serde(skip)]
    pub effects: Vec<Effect>,
}

/// Kill/keep outcome
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub target: Target,
    pub decision: Decision,
}

/// One dashboard row per target
#[derive(Debug, Clone, Serialize)]
pub struct TargetRow {
    pub lead_id: String,
    pub firm_name: String,
    pub tier: LeadTier,
    pub state: TargetState,
    pub touch_count: u32,
    pub last_touch_date: Option<DateTime<Utc>>,
    pub expected_reply_date: Option<DateTime<Utc>>,
    pub days_overdue: i64,
    pub is_overdue: bool,
    pub next_action: NextAction,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub proof_assets: Vec<ProofAsset>,
}

/// Wave dashboard: targets in working order plus funnel aggregates
#[derive(Debug, Clone, Serialize)]
pub struct WaveDashboard {
    pub wave_id: String,
    pub name: String,
    pub persona: String,
    pub status: WaveStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days_remaining: i64,
    pub stats: WaveStats,
    pub reply_to_meeting_pct: u32,
    pub targets: Vec<TargetRow>,
}

/// One entry in the kill/keep queue, with an advisory recommendation
#[derive(Debug, Clone, Serialize)]
pub struct KillKeepItem {
    pub wave_id: String,
    pub wave_name: String,
    pub lead_id: String,
    pub firm_name: String,
    pub tier: LeadTier,
    pub touch_count: u32,
    pub days_overdue: i64,
    /// Advisory only; never applied automatically
    pub recommendation: Decision,
}

/// Wave listing summary
#[derive(Debug, Clone, Serialize)]
pub struct WaveSummary {
    pub id: String,
    pub name: String,
    pub persona: String,
    pub status: WaveStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub stats: WaveStats,
}

/// Pure derivation of the next operator action from a target snapshot.
/// Identical snapshot and clock yield identical output.
pub fn next_action(target: &Target, max_touches: u32, now: DateTime<Utc>) -> NextAction {
    let overdue = target.days_overdue(now);

    match target.state {
        TargetState::Cold => NextAction {
            action: ActionKind::SendProofMailer,
            description: "Send the opening proof-point mailer".to_string(),
            priority: Priority::High,
            due_in_days: None,
        },
        TargetState::ProofSent | TargetState::FollowUp1 | TargetState::FollowUp2 => {
            if overdue > 0 && target.touch_count >= max_touches {
                NextAction {
                    action: ActionKind::KillKeepDecision,
                    description: format!(
                        "{} touches without a reply; decide kill or keep",
                        target.touch_count
                    ),
                    priority: Priority::High,
                    due_in_days: Some(0),
                }
            } else if overdue > 0 {
                NextAction {
                    action: ActionKind::SendFollowUp,
                    description: "Reply window elapsed; send the next follow-up".to_string(),
                    priority: Priority::High,
                    due_in_days: Some(0),
                }
            } else {
                let due = target
                    .expected_reply_date
                    .map(|expected| days_until_ceil(now, expected))
                    .unwrap_or(0);
                NextAction {
                    action: ActionKind::WaitForReply,
                    description: "Awaiting reply inside the expected window".to_string(),
                    priority: Priority::Medium,
                    due_in_days: Some(due),
                }
            }
        }
        TargetState::ReplyReceived => NextAction {
            action: ActionKind::ScheduleMeeting,
            description: "Prospect replied; schedule the meeting".to_string(),
            priority: Priority::Urgent,
            due_in_days: None,
        },
        TargetState::MeetingScheduled => NextAction {
            action: ActionKind::PrepareMeeting,
            description: "Prepare the meeting brief".to_string(),
            priority: Priority::High,
            due_in_days: Some(1),
        },
        TargetState::Qualified | TargetState::Killed | TargetState::Nurture => NextAction {
            action: ActionKind::None,
            description: "No outreach action".to_string(),
            priority: Priority::Low,
            due_in_days: None,
        },
    }
}

/// Owns cohort lifecycle and per-target outreach state
pub struct WaveOrchestrator {
    store: JsonCollectionStore<Wave>,
    contacts: Arc<dyn ContactStore>,
    scorer: Arc<dyn LeadScorer>,
    matcher: Arc<dyn ProofMatcher>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl WaveOrchestrator {
    /// Open the orchestrator over the waves collection
    pub fn new(
        config: EngineConfig,
        contacts: Arc<dyn ContactStore>,
        scorer: Arc<dyn LeadScorer>,
        matcher: Arc<dyn ProofMatcher>,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let store = JsonCollectionStore::new(
            &config.storage_root,
            "waves",
            WAVES_SCHEMA_VERSION,
            config.lock_timeout(),
        )?;
        Ok(Self {
            store,
            contacts,
            scorer,
            matcher,
            clock,
            config,
        })
    }

    /// Snapshot up to `cohort_size` leads into a new active wave. Leads the
    /// contact store cannot resolve are skipped, not fatal.
    pub async fn create_wave(
        &self,
        name: &str,
        persona: &str,
        start_date: Option<DateTime<Utc>>,
        lead_ids: &[String],
    ) -> EngineResult<Wave> {
        if name.trim().is_empty() {
            return Err(EngineError::validation_field("name", "wave name is required"));
        }

        let now = self.clock.now();
        let start = start_date.unwrap_or(now);
        let cadence = CadencePlan::for_persona(
            persona,
            self.config.default_reply_expected_days,
            self.config.default_max_touches,
        );

        if lead_ids.len() > self.config.cohort_size {
            debug!(
                dropped = lead_ids.len() - self.config.cohort_size,
                cohort_size = self.config.cohort_size,
                "cohort size cap applied"
            );
        }

        let mut targets = Vec::new();
        for lead_id in lead_ids.iter().take(self.config.cohort_size) {
            match self.contacts.lead(lead_id) {
                Some(lead) => {
                    let score = self.scorer.score(&lead);
                    targets.push(Target::from_lead(&lead, score, now));
                }
                None => warn!(lead_id = %lead_id, "skipping unknown lead at wave creation"),
            }
        }

        let wave = Wave::new(name, persona, start, cadence, targets, now);
        let created = wave.clone();
        self.store
            .update(move |doc| {
                doc.items.push(wave);
                Ok::<_, EngineError>(())
            })
            .await??;

        info!(
            wave_id = %created.id,
            targets = created.targets.len(),
            persona = %created.persona,
            "wave created"
        );
        Ok(created)
    }

    /// Record an outbound touch: advance the cadence state, refresh the
    /// reply window, and bump the touch count
    pub async fn record_touch(
        &self,
        wave_id: &str,
        lead_id: &str,
        channel: Option<TouchChannel>,
        note: Option<String>,
    ) -> EngineResult<TargetUpdate> {
        let now = self.clock.now();
        self.mutate_target(wave_id, lead_id, move |target, cadence| {
            let next_state = target.state.advance_touch().ok_or_else(|| {
                EngineError::invalid_transition("target", target.state.as_str(), "record_touch")
            })?;

            target.state = next_state;
            target.touch_count += 1;
            target.last_touch_date = Some(now);
            target.expected_reply_date =
                Some(now + chrono::Duration::days(cadence.reply_expected_days));

            let detail = match (channel, note) {
                (Some(channel), Some(note)) => Some(format!("{channel:?}: {note}")),
                (Some(channel), None) => Some(format!("{channel:?}")),
                (None, note) => note,
            };
            target.record(now, "touch_recorded", detail);
            Ok(())
        })
        .await
    }

    /// Record an inbound reply from any non-terminal state; emits a
    /// `reply_received` effect for the dispatcher
    pub async fn record_reply(
        &self,
        wave_id: &str,
        lead_id: &str,
        note: Option<String>,
    ) -> EngineResult<ReplyOutcome> {
        let now = self.clock.now();
        let update = self
            .mutate_target(wave_id, lead_id, move |target, _cadence| {
                if !target.state.accepts_reply() {
                    return Err(EngineError::invalid_transition(
                        "target",
                        target.state.as_str(),
                        "record_reply",
                    ));
                }
                target.state = TargetState::ReplyReceived;
                target.reply_date = Some(now);
                target.record(now, "reply_recorded", note);
                Ok(())
            })
            .await?;

        let effects = vec![Effect::emit_signal(
            "reply_received",
            Some(update.target.lead_id.clone()),
            Some(update.target.firm_name.clone()),
            "wave_orchestrator",
            None,
        )];

        Ok(ReplyOutcome {
            target: update.target,
            next_action: update.next_action,
            effects,
        })
    }

    /// Record a scheduled meeting from REPLY_RECEIVED or later
    pub async fn record_meeting(
        &self,
        wave_id: &str,
        lead_id: &str,
        meeting_date: Option<DateTime<Utc>>,
    ) -> EngineResult<TargetUpdate> {
        let now = self.clock.now();
        self.mutate_target(wave_id, lead_id, move |target, _cadence| {
            if !target.state.accepts_meeting() {
                return Err(EngineError::invalid_transition(
                    "target",
                    target.state.as_str(),
                    "record_meeting",
                ));
            }
            let scheduled_for = meeting_date.unwrap_or(now);
            target.state = TargetState::MeetingScheduled;
            target.meeting_date = Some(scheduled_for);
            target.record(
                now,
                "meeting_scheduled",
                Some(format!("for {}", scheduled_for.format("%Y-%m-%d"))),
            );
            Ok(())
        })
        .await
    }

    /// Promote a meeting-stage target to QUALIFIED
    pub async fn qualify_target(&self, wave_id: &str, lead_id: &str) -> EngineResult<TargetUpdate> {
        let now = self.clock.now();
        self.mutate_target(wave_id, lead_id, move |target, _cadence| {
            if target.state != TargetState::MeetingScheduled {
                return Err(EngineError::invalid_transition(
                    "target",
                    target.state.as_str(),
                    "qualify",
                ));
            }
            target.state = TargetState::Qualified;
            target.record(now, "qualified", None);
            Ok(())
        })
        .await
    }

    /// Apply an operator's kill/keep decision. Valid only at the decision
    /// gate: touch cap reached, reply window elapsed, and the target still
    /// sitting in the cadence. The engine never decides on its own.
    pub async fn kill_keep_decision(
        &self,
        wave_id: &str,
        lead_id: &str,
        decision: Decision,
        reason: Option<String>,
    ) -> EngineResult<DecisionOutcome> {
        let now = self.clock.now();
        let update = self
            .mutate_target(wave_id, lead_id, move |target, cadence| {
                let overdue = target.days_overdue(now);
                let at_gate = target.touch_count >= cadence.max_touches
                    && overdue > 0
                    && target.state.decision_eligible();
                if !at_gate {
                    return Err(EngineError::invalid_transition(
                        "target",
                        target.state.as_str(),
                        "kill_keep_decision",
                    ));
                }

                match decision {
                    Decision::Kill => {
                        target.state = TargetState::Killed;
                        target.killed = true;
                        target.record(now, "killed", reason);
                    }
                    Decision::Keep => {
                        target.state = TargetState::Nurture;
                        target.record(now, "moved_to_nurture", reason);
                    }
                }
                Ok(())
            })
            .await?;

        info!(
            wave_id,
            lead_id,
            decision = %decision,
            "kill/keep decision applied"
        );
        Ok(DecisionOutcome {
            target: update.target,
            decision,
        })
    }

    /// Mark an active wave completed
    pub async fn complete_wave(&self, wave_id: &str) -> EngineResult<Wave> {
        self.transition_wave(wave_id, WaveStatus::Active, WaveStatus::Completed)
            .await
    }

    /// Archive a completed wave
    pub async fn archive_wave(&self, wave_id: &str) -> EngineResult<Wave> {
        self.transition_wave(wave_id, WaveStatus::Completed, WaveStatus::Archived)
            .await
    }

    /// Fetch one wave by id
    pub async fn get_wave(&self, wave_id: &str) -> EngineResult<Wave> {
        let doc = self.store.read()?;
        doc.items
            .into_iter()
            .find(|wave| wave.id == wave_id)
            .ok_or_else(|| EngineError::not_found("wave", wave_id))
    }

    /// Summaries of every wave
    pub async fn list_waves(&self) -> EngineResult<Vec<WaveSummary>> {
        let doc = self.store.read()?;
        Ok(doc
            .items
            .iter()
            .map(|wave| WaveSummary {
                id: wave.id.clone(),
                name: wave.name.clone(),
                persona: wave.persona.clone(),
                status: wave.status,
                start_date: wave.start_date,
                end_date: wave.end_date,
                stats: wave.stats.clone(),
            })
            .collect())
    }

    /// Dashboard for one wave: targets sorted overdue-first (most overdue on
    /// top), funnel stats, and days remaining in the window
    pub async fn wave_dashboard(&self, wave_id: &str) -> EngineResult<WaveDashboard> {
        let doc = self.store.read()?;
        let now = self.clock.now();

        let wave = doc
            .items
            .iter()
            .find(|wave| wave.id == wave_id)
            .ok_or_else(|| EngineError::not_found("wave", wave_id))?;

        let mut rows: Vec<TargetRow> = wave
            .targets
            .iter()
            .map(|target| {
                let overdue = target.days_overdue(now);
                let action = next_action(target, wave.cadence.max_touches, now);
                let proof_assets = if action.action == ActionKind::SendProofMailer {
                    self.contacts
                        .lead(&target.lead_id)
                        .map(|lead| self.matcher.candidate_assets(&lead))
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                TargetRow {
                    lead_id: target.lead_id.clone(),
                    firm_name: target.firm_name.clone(),
                    tier: target.tier,
                    state: target.state,
                    touch_count: target.touch_count,
                    last_touch_date: target.last_touch_date,
                    expected_reply_date: target.expected_reply_date,
                    days_overdue: overdue.max(0),
                    is_overdue: overdue > 0,
                    next_action: action,
                    proof_assets,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.is_overdue
                .cmp(&a.is_overdue)
                .then_with(|| b.days_overdue.cmp(&a.days_overdue))
        });

        let replies = wave.stats.replies;
        let meetings = wave.stats.meetings;
        let reply_to_meeting_pct = if replies == 0 {
            0
        } else {
            ((meetings as f64 / replies as f64) * 100.0).round() as u32
        };

        Ok(WaveDashboard {
            wave_id: wave.id.clone(),
            name: wave.name.clone(),
            persona: wave.persona.clone(),
            status: wave.status,
            start_date: wave.start_date,
            end_date: wave.end_date,
            days_remaining: days_until_ceil(now, wave.end_date),
            stats: wave.stats.clone(),
            reply_to_meeting_pct,
            targets: rows,
        })
    }

    /// Scan all active waves for targets at the decision gate, most overdue
    /// first, annotated with the advisory recommendation
    pub async fn kill_keep_queue(&self) -> EngineResult<Vec<KillKeepItem>> {
        let doc = self.store.read()?;
        let now = self.clock.now();

        let mut queue = Vec::new();
        for wave in doc.items.iter().filter(|w| w.status == WaveStatus::Active) {
            for target in &wave.targets {
                let overdue = target.days_overdue(now);
                if target.state.decision_eligible()
                    && target.touch_count >= wave.cadence.max_touches
                    && overdue > 0
                {
                    queue.push(KillKeepItem {
                        wave_id: wave.id.clone(),
                        wave_name: wave.name.clone(),
                        lead_id: target.lead_id.clone(),
                        firm_name: target.firm_name.clone(),
                        tier: target.tier,
                        touch_count: target.touch_count,
                        days_overdue: overdue,
                        recommendation: if target.tier == LeadTier::A {
                            Decision::Keep
                        } else {
                            Decision::Kill
                        },
                    });
                }
            }
        }

        queue.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        Ok(queue)
    }

    async fn mutate_target<F>(
        &self,
        wave_id: &str,
        lead_id: &str,
        f: F,
    ) -> EngineResult<TargetUpdate>
    where
        F: FnOnce(&mut Target, &CadencePlan) -> EngineResult<()>,
    {
        let now = self.clock.now();
        let wave_id = wave_id.to_string();
        let lead_id = lead_id.to_string();

        let update = self
            .store
            .update(move |doc| {
                let wave = doc
                    .items
                    .iter_mut()
                    .find(|wave| wave.id == wave_id)
                    .ok_or_else(|| EngineError::not_found("wave", wave_id.clone()))?;

                let cadence = wave.cadence.clone();
                let target = wave
                    .target_mut(&lead_id)
                    .ok_or_else(|| EngineError::not_found("target", lead_id.clone()))?;

                f(target, &cadence)?;
                let snapshot = target.clone();
                wave.refresh_stats();

                Ok::<_, EngineError>(TargetUpdate {
                    next_action: next_action(&snapshot, cadence.max_touches, now),
                    target: snapshot,
                })
            })
            .await??;

        Ok(update)
    }

    async fn transition_wave(
        &self,
        wave_id: &str,
        from: WaveStatus,
        to: WaveStatus,
    ) -> EngineResult<Wave> {
        let wave_id = wave_id.to_string();
        let updated = self
            .store
            .update(move |doc| {
                let wave = doc
                    .items
                    .iter_mut()
                    .find(|wave| wave.id == wave_id)
                    .ok_or_else(|| EngineError::not_found("wave", wave_id.clone()))?;

                if wave.status != from {
                    return Err(EngineError::invalid_transition(
                        "wave",
                        wave.status.as_str(),
                        to.as_str(),
                    ));
                }
                wave.status = to;
                Ok::<_, EngineError>(wave.clone())
            })
            .await??;

        Ok(updated)
    }
}
