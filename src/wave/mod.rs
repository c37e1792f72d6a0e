//! Wave cohort lifecycle and per-target outreach state machine
//!
//! A wave is a six-week outreach cohort sharing a persona-driven cadence.
//! Targets belong to exactly one wave, are created only at wave creation,
//! and carry an append-only history for the wave's lifetime.

pub mod cadence;
pub mod orchestrator;
pub mod state;

pub use cadence::{CadencePlan, TouchChannel, TouchStep};
pub use orchestrator::{
    next_action, ActionKind, Decision, DecisionOutcome, KillKeepItem, NextAction, ReplyOutcome,
    TargetRow, TargetUpdate, WaveDashboard, WaveOrchestrator, WaveSummary, WAVES_SCHEMA_VERSION,
};
pub use state::{Target, TargetState, Wave, WaveStats, WaveStatus, WAVE_LENGTH_DAYS};

#[cfg(test)]
mod tests;
