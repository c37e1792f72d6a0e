//! Composition root wiring the orchestrator, queue, tracker, and dispatcher
//!
//! One `Engine` owns the three collection coordinators over a shared storage
//! root, plus the effect dispatcher that materializes producer effects into
//! signals. The convenience wrappers here are the only place effects are
//! applied automatically; callers using the components directly own dispatch
//! themselves.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::effects::EffectDispatcher;
use crate::error::EngineResult;
use crate::leads::{ContactStore, LeadScorer, ProofMatcher, SnapshotScorer, StaticProofMatcher};
use crate::signal::{Signal, SignalQueue};
use crate::storage::StorageResult;
use crate::vendor::{ApprovalOutcome, VendorTracker};
use crate::wave::{ReplyOutcome, WaveOrchestrator};

/// The assembled campaign orchestration engine
pub struct Engine {
    pub waves: WaveOrchestrator,
    pub signals: Arc<SignalQueue>,
    pub vendors: VendorTracker,
    pub effects: EffectDispatcher,
}

impl Engine {
    /// Assemble an engine with explicit collaborators
    pub fn new(
        config: EngineConfig,
        contacts: Arc<dyn ContactStore>,
        scorer: Arc<dyn LeadScorer>,
        matcher: Arc<dyn ProofMatcher>,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let signals = Arc::new(SignalQueue::new(
            &config.storage_root,
            clock.clone(),
            config.lock_timeout(),
        )?);

        Ok(Self {
            waves: WaveOrchestrator::new(
                config.clone(),
                contacts,
                scorer,
                matcher,
                clock.clone(),
            )?,
            vendors: VendorTracker::new(config, clock)?,
            effects: EffectDispatcher::new(signals.clone()),
            signals,
        })
    }

    /// Assemble an engine with the system clock and passthrough collaborators
    pub fn open(config: EngineConfig, contacts: Arc<dyn ContactStore>) -> StorageResult<Self> {
        Self::new(
            config,
            contacts,
            Arc::new(SnapshotScorer),
            Arc::new(StaticProofMatcher::default()),
            Arc::new(SystemClock),
        )
    }

    /// Record a reply and materialize its effects into the queue
    pub async fn record_reply(
        &self,
        wave_id: &str,
        lead_id: &str,
        note: Option<String>,
    ) -> EngineResult<(ReplyOutcome, Vec<Signal>)> {
        let outcome = self.waves.record_reply(wave_id, lead_id, note).await?;
        let emitted = self.effects.dispatch(outcome.effects.clone()).await;
        Ok((outcome, emitted))
    }

    /// Approve a vendor and materialize its effects into the queue
    pub async fn approve_vendor(
        &self,
        lead_id: &str,
        approval_date: Option<chrono::DateTime<chrono::Utc>>,
    ) -> EngineResult<(ApprovalOutcome, Vec<Signal>)> {
        let outcome = self.vendors.approve_vendor(lead_id, approval_date).await?;
        let emitted = self.effects.dispatch(outcome.effects.clone()).await;
        Ok((outcome, emitted))
    }
}
