//! SLA-bound signal queue
//!
//! Central intake for any time-sensitive trigger. A static type registry
//! fixes SLA, owner, action, and priority per type; SLA standing is computed
//! from wall-clock time on every read. Producers feed the queue one way,
//! either directly or through the effects outbox.

pub mod detect;
pub mod queue;
pub mod registry;
pub mod types;

pub use detect::{detect_signals, SignalCandidate, WHALE_DEAL_VALUE};
pub use queue::{
    CreateSignalRequest, PendingSignals, SignalDashboard, SignalQueue, SignalView,
    SIGNALS_SCHEMA_VERSION,
};
pub use registry::{display_name, lookup, registered_types, SignalTypeSpec};
pub use types::{Priority, Signal, SignalStatus, SlaState};
