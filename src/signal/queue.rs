//! Signal queue: intake, transitions, and SLA aggregation
//!
//! The queue owns every signal from creation until a terminal status. SLA
//! standing is derived from wall-clock time on each read, never stored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::audit::HistoryEntry;
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::storage::{JsonCollectionStore, StorageResult};

use super::registry;
use super::types::{Priority, Signal, SignalStatus, SlaState};

/// Schema version of the signals collection document
pub const SIGNALS_SCHEMA_VERSION: u32 = 1;

/// Intake request; all routing metadata comes from the type registry
#[derive(Debug, Clone, Default)]
pub struct CreateSignalRequest {
    pub signal_type: String,
    pub lead_id: Option<String>,
    pub firm_name: Option<String>,
    pub source: String,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub notes: Option<String>,
}

/// One signal annotated with computed SLA standing for display
#[derive(Debug, Clone, Serialize)]
pub struct SignalView {
    #[serde(flatten)]
    pub signal: Signal,
    pub display_name: String,
    pub sla: SlaState,
    pub age_hours: i64,
}

impl SignalView {
    /// Build the display view for a signal as of `now`
    pub fn build(signal: &Signal, now: DateTime<Utc>) -> Self {
        Self {
            signal: signal.clone(),
            display_name: registry::display_name(&signal.signal_type).to_string(),
            sla: signal.sla_state(now),
            age_hours: signal.age_hours(now),
        }
    }
}

/// Pending/in-progress signals in working order, with breach counts
#[derive(Debug, Clone, Serialize)]
pub struct PendingSignals {
    pub breached: usize,
    pub urgent: usize,
    pub signals: Vec<SignalView>,
}

/// Aggregate dashboard over the whole queue
#[derive(Debug, Clone, Serialize)]
pub struct SignalDashboard {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_owner: BTreeMap<String, Vec<SignalView>>,
    pub breached: Vec<SignalView>,
    pub needs_leadership: Vec<SignalView>,
}

/// Central intake for time-sensitive triggers
pub struct SignalQueue {
    store: JsonCollectionStore<Signal>,
    clock: Arc<dyn Clock>,
}

impl SignalQueue {
    /// Open the queue over the signals collection under `root`
    pub fn new(root: &Path, clock: Arc<dyn Clock>, lock_timeout: Duration) -> StorageResult<Self> {
        Ok(Self {
            store: JsonCollectionStore::new(root, "signals", SIGNALS_SCHEMA_VERSION, lock_timeout)?,
            clock,
        })
    }

    /// Create a signal of a registered type. Unknown types are rejected
    /// before any write.
    pub async fn create_signal(&self, req: CreateSignalRequest) -> EngineResult<Signal> {
        let spec = registry::lookup(&req.signal_type).ok_or_else(|| {
            EngineError::validation_field(
                "signal_type",
                format!(
                    "unknown signal type '{}' (known: {})",
                    req.signal_type,
                    registry::registered_types().join(", ")
                ),
            )
        })?;

        let now = self.clock.now();
        let mut signal = Signal {
            id: format!("sig-{}", Uuid::new_v4()),
            signal_type: req.signal_type,
            name: spec.name.to_string(),
            lead_id: req.lead_id,
            firm_name: req.firm_name,
            source: req.source,
            status: SignalStatus::Pending,
            owner: spec.owner.to_string(),
            action: spec.action.to_string(),
            priority: spec.priority,
            sla_hours: spec.sla_hours,
            created_at: now,
            acknowledged_at: None,
            completed_at: None,
            assigned_to: None,
            resolution: None,
            notes: req.notes,
            metadata: req.metadata.unwrap_or_default(),
            history: Vec::new(),
        };
        signal
            .history
            .push(HistoryEntry::new(now, "created", Some(format!("source: {}", signal.source))));

        let created = self
            .store
            .update(move |doc| {
                doc.items.push(signal.clone());
                Ok::<_, EngineError>(signal)
            })
            .await??;

        debug!(
            signal_id = %created.id,
            signal_type = %created.signal_type,
            owner = %created.owner,
            "signal created"
        );
        Ok(created)
    }

    /// Acknowledge a signal and move it to in-progress
    pub async fn acknowledge_signal(
        &self,
        id: &str,
        assigned_to: Option<String>,
    ) -> EngineResult<Signal> {
        self.mutate(id, "acknowledge", move |signal, now| {
            signal.status = SignalStatus::InProgress;
            signal.acknowledged_at = Some(now);
            if assigned_to.is_some() {
                signal.assigned_to = assigned_to;
            }
            signal.history.push(HistoryEntry::new(
                now,
                "acknowledged",
                signal.assigned_to.clone().map(|who| format!("assigned to {who}")),
            ));
        })
        .await
    }

    /// Complete a signal (terminal)
    pub async fn complete_signal(
        &self,
        id: &str,
        resolution: Option<String>,
        notes: Option<String>,
    ) -> EngineResult<Signal> {
        self.mutate(id, "complete", move |signal, now| {
            signal.status = SignalStatus::Completed;
            signal.completed_at = Some(now);
            signal.resolution = resolution;
            if notes.is_some() {
                signal.notes = notes;
            }
            signal
                .history
                .push(HistoryEntry::new(now, "completed", signal.resolution.clone()));
        })
        .await
    }

    /// Dismiss a signal with a reason (terminal)
    pub async fn dismiss_signal(&self, id: &str, reason: Option<String>) -> EngineResult<Signal> {
        self.mutate(id, "dismiss", move |signal, now| {
            signal.status = SignalStatus::Dismissed;
            signal.completed_at = Some(now);
            signal
                .history
                .push(HistoryEntry::new(now, "dismissed", reason));
        })
        .await
    }

    /// Fetch one signal by id
    pub async fn get_signal(&self, id: &str) -> EngineResult<Signal> {
        let doc = self.store.read()?;
        doc.items
            .into_iter()
            .find(|signal| signal.id == id)
            .ok_or_else(|| EngineError::not_found("signal", id))
    }

    /// Pending and in-progress signals in working order: priority rank,
    /// breached-first, then oldest-first
    pub async fn pending_signals(&self) -> EngineResult<PendingSignals> {
        let doc = self.store.read()?;
        let now = self.clock.now();

        let mut views: Vec<SignalView> = doc
            .items
            .iter()
            .filter(|signal| {
                matches!(
                    signal.status,
                    SignalStatus::Pending | SignalStatus::InProgress
                )
            })
            .map(|signal| SignalView::build(signal, now))
            .collect();

        views.sort_by(|a, b| {
            a.signal
                .priority
                .rank()
                .cmp(&b.signal.priority.rank())
                .then_with(|| b.sla.is_breached().cmp(&a.sla.is_breached()))
                .then_with(|| a.signal.created_at.cmp(&b.signal.created_at))
        });

        let breached = views.iter().filter(|v| v.sla.is_breached()).count();
        let urgent = views
            .iter()
            .filter(|v| v.signal.priority == Priority::Urgent)
            .count();

        Ok(PendingSignals {
            breached,
            urgent,
            signals: views,
        })
    }

    /// Aggregate dashboard: status counts, active signals grouped by owner,
    /// the full breached list, and everything urgent or critical
    pub async fn signal_dashboard(&self) -> EngineResult<SignalDashboard> {
        let doc = self.store.read()?;
        let now = self.clock.now();

        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        for signal in &doc.items {
            *by_status.entry(signal.status.to_string()).or_default() += 1;
        }

        let active: Vec<SignalView> = doc
            .items
            .iter()
            .filter(|signal| !signal.status.is_terminal())
            .map(|signal| SignalView::build(signal, now))
            .collect();

        let mut by_owner: BTreeMap<String, Vec<SignalView>> = BTreeMap::new();
        for view in &active {
            by_owner
                .entry(view.signal.owner.clone())
                .or_default()
                .push(view.clone());
        }

        let breached: Vec<SignalView> = active
            .iter()
            .filter(|v| v.sla.is_breached())
            .cloned()
            .collect();
        let needs_leadership: Vec<SignalView> = active
            .iter()
            .filter(|v| {
                matches!(v.signal.priority, Priority::Urgent | Priority::Critical)
            })
            .cloned()
            .collect();

        Ok(SignalDashboard {
            total: doc.items.len(),
            by_status,
            by_owner,
            breached,
            needs_leadership,
        })
    }

    async fn mutate<F>(&self, id: &str, attempted: &'static str, f: F) -> EngineResult<Signal>
    where
        F: FnOnce(&mut Signal, DateTime<Utc>) + Send,
    {
        let now = self.clock.now();
        let id = id.to_string();

        let updated = self
            .store
            .update(move |doc| {
                let signal = doc
                    .items
                    .iter_mut()
                    .find(|signal| signal.id == id)
                    .ok_or_else(|| EngineError::not_found("signal", id.clone()))?;

                if signal.status.is_terminal() {
                    return Err(EngineError::invalid_transition(
                        "signal",
                        signal.status.as_str(),
                        attempted,
                    ));
                }

                f(signal, now);
                Ok::<_, EngineError>(signal.clone())
            })
            .await??;

        debug!(signal_id = %updated.id, status = %updated.status, "signal transition");
        Ok(updated)
    }
}
