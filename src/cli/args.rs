//! Argument parsing structures for the cadence CLI

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Campaign orchestration and SLA signal engine
#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Campaign orchestration and SLA signal engine", long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the storage root directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// JSON lead export backing the contact store
    #[arg(long, global = true)]
    pub leads: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage outreach waves
    Wave {
        #[command(subcommand)]
        command: WaveCommands,
    },
    /// Manage SLA signals
    Signal {
        #[command(subcommand)]
        command: SignalCommands,
    },
    /// Manage vendor approvals
    Vendor {
        #[command(subcommand)]
        command: VendorCommands,
    },
}

#[derive(Subcommand)]
pub enum WaveCommands {
    /// Create a wave from a cohort of leads
    Create {
        /// Wave name
        name: String,
        /// Persona driving the cadence template
        #[arg(long, default_value = "default")]
        persona: String,
        /// Wave start date (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        start_date: Option<String>,
        /// Lead ids to snapshot (repeatable)
        #[arg(long = "lead", value_name = "LEAD_ID")]
        leads: Vec<String>,
    },
    /// Record an outbound touch against a target
    Touch {
        wave_id: String,
        lead_id: String,
        /// Channel used (mailer, email, call, linkedin)
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Record an inbound reply
    Reply {
        wave_id: String,
        lead_id: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Record a scheduled meeting
    Meeting {
        wave_id: String,
        lead_id: String,
        /// Meeting date (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Mark a meeting-stage target as qualified
    Qualify { wave_id: String, lead_id: String },
    /// Resolve a stalled target with a kill or keep decision
    Decide {
        wave_id: String,
        lead_id: String,
        /// 'kill' or 'keep'
        decision: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Show the wave dashboard
    Dashboard { wave_id: String },
    /// List targets awaiting a kill/keep decision across active waves
    KillKeep,
    /// List waves
    List,
    /// Mark an active wave completed
    Complete { wave_id: String },
    /// Archive a completed wave
    Archive { wave_id: String },
}

#[derive(Subcommand)]
pub enum SignalCommands {
    /// Create a signal of a registered type
    Create {
        /// Signal type key (e.g. whale_alert)
        signal_type: String,
        #[arg(long)]
        lead: Option<String>,
        #[arg(long)]
        firm: Option<String>,
        #[arg(long, default_value = "cli")]
        source: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Acknowledge a signal and move it to in-progress
    Ack {
        signal_id: String,
        #[arg(long)]
        assign: Option<String>,
    },
    /// Complete a signal
    Complete {
        signal_id: String,
        #[arg(long)]
        resolution: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Dismiss a signal with a reason
    Dismiss {
        signal_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// List pending and in-progress signals in working order
    Pending,
    /// Show the signal dashboard
    Dashboard,
    /// Run detection rules against a lead snapshot
    Detect {
        lead_id: String,
        /// Create a signal for each candidate instead of only listing them
        #[arg(long)]
        materialize: bool,
    },
}

#[derive(Subcommand)]
pub enum VendorCommands {
    /// Submit (or re-submit, idempotently) a vendor application
    Apply {
        lead_id: String,
        firm_name: String,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Move an applied record to pending review
    MarkPending { lead_id: String },
    /// Approve a waiting record
    Approve {
        lead_id: String,
        /// Approval date (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Reject a waiting record with a reason
    Reject { lead_id: String, reason: String },
    /// Expire a waiting record whose procurement cycle lapsed
    Expire { lead_id: String },
    /// Show stalled applications and tier-A leads with no record
    Alerts,
    /// Show vendor approval aggregates
    Summary,
}
