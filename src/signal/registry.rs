//! Static signal type registry
//!
//! Producers supply only a type key; SLA, owner, action, and priority come
//! from here, so routing is uniform regardless of where a signal originated.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::types::Priority;

/// Registry metadata for one signal type
#[derive(Debug, Clone, Copy)]
pub struct SignalTypeSpec {
    pub key: &'static str,
    pub name: &'static str,
    pub sla_hours: i64,
    pub owner: &'static str,
    pub action: &'static str,
    pub priority: Priority,
}

static REGISTRY: Lazy<HashMap<&'static str, SignalTypeSpec>> = Lazy::new(|| {
    [
        SignalTypeSpec {
            key: "whale_alert",
            name: "Whale Alert",
            sla_hours: 24,
            owner: "CEO",
            action: "Call the principal directly",
            priority: Priority::Critical,
        },
        SignalTypeSpec {
            key: "warm_intro",
            name: "Warm Intro Available",
            sla_hours: 48,
            owner: "CEO",
            action: "Request the introduction while it is fresh",
            priority: Priority::High,
        },
        SignalTypeSpec {
            key: "overdue_followup",
            name: "Overdue Follow-Up",
            sla_hours: 72,
            owner: "account_exec",
            action: "Send the next cadence touch",
            priority: Priority::Medium,
        },
        SignalTypeSpec {
            key: "reply_received",
            name: "Reply Received",
            sla_hours: 4,
            owner: "account_exec",
            action: "Respond and propose meeting times",
            priority: Priority::Urgent,
        },
        SignalTypeSpec {
            key: "vendor_approved",
            name: "Vendor Approval Granted",
            sla_hours: 24,
            owner: "account_exec",
            action: "Notify the prospect and restart outreach",
            priority: Priority::High,
        },
        SignalTypeSpec {
            key: "vendor_stalled",
            name: "Vendor Approval Stalled",
            sla_hours: 48,
            owner: "ops",
            action: "Chase the procurement contact",
            priority: Priority::Medium,
        },
    ]
    .into_iter()
    .map(|spec| (spec.key, spec))
    .collect()
});

/// Look up a signal type by key
pub fn lookup(key: &str) -> Option<&'static SignalTypeSpec> {
    REGISTRY.get(key)
}

/// Display name for a type key; unrecognized legacy types render as a
/// sentinel instead of failing aggregate views
pub fn display_name(key: &str) -> &'static str {
    lookup(key).map(|spec| spec.name).unwrap_or("unknown")
}

/// All registered type keys, sorted
pub fn registered_types() -> Vec<&'static str> {
    let mut keys: Vec<_> = REGISTRY.keys().copied().collect();
    keys.sort_unstable();
    keys
}
