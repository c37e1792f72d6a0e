//! Effect outbox connecting producers to the signal queue
//!
//! State-changing operations never write to the queue themselves; they
//! return `Effect` values describing the signals they want emitted, and a
//! dispatcher applies them. The producer-to-sink coupling stays explicit and
//! testable instead of relying on callers to remember a second write.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::EngineResult;
use crate::signal::{CreateSignalRequest, Signal, SignalQueue};

/// Side effect requested by a state-changing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    EmitSignal {
        signal_type: String,
        lead_id: Option<String>,
        firm_name: Option<String>,
        source: String,
        notes: Option<String>,
    },
}

impl Effect {
    /// Build an emit-signal effect
    pub fn emit_signal(
        signal_type: &str,
        lead_id: Option<String>,
        firm_name: Option<String>,
        source: &str,
        notes: Option<String>,
    ) -> Self {
        Self::EmitSignal {
            signal_type: signal_type.to_string(),
            lead_id,
            firm_name,
            source: source.to_string(),
            notes,
        }
    }
}

/// Destination for emitted signals
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn emit(&self, req: CreateSignalRequest) -> EngineResult<Signal>;
}

#[async_trait]
impl SignalSink for SignalQueue {
    async fn emit(&self, req: CreateSignalRequest) -> EngineResult<Signal> {
        self.create_signal(req).await
    }
}

/// Applies effects returned by producers to the signal sink
pub struct EffectDispatcher {
    sink: Arc<dyn SignalSink>,
}

impl EffectDispatcher {
    /// Create a dispatcher over a sink
    pub fn new(sink: Arc<dyn SignalSink>) -> Self {
        Self { sink }
    }

    /// Materialize each effect, continuing past individual failures so one
    /// bad effect never blocks the rest of a batch
    pub async fn dispatch(&self, effects: Vec<Effect>) -> Vec<Signal> {
        let mut created = Vec::new();

        for effect in effects {
            match effect {
                Effect::EmitSignal {
                    signal_type,
                    lead_id,
                    firm_name,
                    source,
                    notes,
                } => {
                    let req = CreateSignalRequest {
                        signal_type,
                        lead_id,
                        firm_name,
                        source,
                        metadata: None,
                        notes,
                    };
                    match self.sink.emit(req).await {
                        Ok(signal) => {
                            debug!(signal_id = %signal.id, "effect materialized");
                            created.push(signal);
                        }
                        Err(e) => {
                            warn!(error = %e, "dropping effect: signal creation failed");
                        }
                    }
                }
            }
        }

        created
    }
}
