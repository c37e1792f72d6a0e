//! Command execution for the cadence CLI
//!
//! Results print as pretty JSON on stdout; logs go to stderr so output can
//! be piped.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::leads::{ContactStore, StaticContactStore};
use crate::signal::{detect_signals, CreateSignalRequest};
use crate::wave::{Decision, TouchChannel};

use super::args::{Cli, Commands, SignalCommands, VendorCommands, WaveCommands};

/// Execute a parsed CLI invocation
pub async fn execute_command(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage_root = dir;
    }

    let contacts: Arc<dyn ContactStore> = match cli.leads {
        Some(path) => Arc::new(StaticContactStore::from_json_file(&path)?),
        None => Arc::new(StaticContactStore::default()),
    };

    let engine = Engine::open(config, contacts.clone()).context("Failed to open engine")?;

    match cli.command {
        Commands::Wave { command } => run_wave(&engine, command).await,
        Commands::Signal { command } => run_signal(&engine, contacts.as_ref(), command).await,
        Commands::Vendor { command } => run_vendor(&engine, contacts.as_ref(), command).await,
    }
}

async fn run_wave(engine: &Engine, command: WaveCommands) -> Result<()> {
    match command {
        WaveCommands::Create {
            name,
            persona,
            start_date,
            leads,
        } => {
            let start = start_date.as_deref().map(parse_date).transpose()?;
            let wave = engine
                .waves
                .create_wave(&name, &persona, start, &leads)
                .await?;
            print_json(&wave)
        }
        WaveCommands::Touch {
            wave_id,
            lead_id,
            channel,
            note,
        } => {
            let channel: Option<TouchChannel> =
                channel.as_deref().map(str::parse).transpose()?;
            let update = engine
                .waves
                .record_touch(&wave_id, &lead_id, channel, note)
                .await?;
            print_json(&update)
        }
        WaveCommands::Reply {
            wave_id,
            lead_id,
            note,
        } => {
            let (outcome, emitted) = engine.record_reply(&wave_id, &lead_id, note).await?;
            print_json(&serde_json::json!({
                "target": outcome.target,
                "next_action": outcome.next_action,
                "signals_emitted": emitted.len(),
            }))
        }
        WaveCommands::Meeting {
            wave_id,
            lead_id,
            date,
        } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            let update = engine
                .waves
                .record_meeting(&wave_id, &lead_id, date)
                .await?;
            print_json(&update)
        }
        WaveCommands::Qualify { wave_id, lead_id } => {
            let update = engine.waves.qualify_target(&wave_id, &lead_id).await?;
            print_json(&update)
        }
        WaveCommands::Decide {
            wave_id,
            lead_id,
            decision,
            reason,
        } => {
            let decision: Decision = decision.parse()?;
            let outcome = engine
                .waves
                .kill_keep_decision(&wave_id, &lead_id, decision, reason)
                .await?;
            print_json(&outcome)
        }
        WaveCommands::Dashboard { wave_id } => {
            let dashboard = engine.waves.wave_dashboard(&wave_id).await?;
            print_json(&dashboard)
        }
        WaveCommands::KillKeep => {
            let queue = engine.waves.kill_keep_queue().await?;
            print_json(&queue)
        }
        WaveCommands::List => {
            let waves = engine.waves.list_waves().await?;
            print_json(&waves)
        }
        WaveCommands::Complete { wave_id } => {
            let wave = engine.waves.complete_wave(&wave_id).await?;
            print_json(&wave)
        }
        WaveCommands::Archive { wave_id } => {
            let wave = engine.waves.archive_wave(&wave_id).await?;
            print_json(&wave)
        }
    }
}

async fn run_signal(
    engine: &Engine,
    contacts: &dyn ContactStore,
    command: SignalCommands,
) -> Result<()> {
    match command {
        SignalCommands::Create {
            signal_type,
            lead,
            firm,
            source,
            note,
        } => {
            let signal = engine
                .signals
                .create_signal(CreateSignalRequest {
                    signal_type,
                    lead_id: lead,
                    firm_name: firm,
                    source,
                    metadata: None,
                    notes: note,
                })
                .await?;
            print_json(&signal)
        }
        SignalCommands::Ack { signal_id, assign } => {
            let signal = engine.signals.acknowledge_signal(&signal_id, assign).await?;
            print_json(&signal)
        }
        SignalCommands::Complete {
            signal_id,
            resolution,
            note,
        } => {
            let signal = engine
                .signals
                .complete_signal(&signal_id, resolution, note)
                .await?;
            print_json(&signal)
        }
        SignalCommands::Dismiss { signal_id, reason } => {
            let signal = engine.signals.dismiss_signal(&signal_id, reason).await?;
            print_json(&signal)
        }
        SignalCommands::Pending => {
            let pending = engine.signals.pending_signals().await?;
            print_json(&pending)
        }
        SignalCommands::Dashboard => {
            let dashboard = engine.signals.signal_dashboard().await?;
            print_json(&dashboard)
        }
        SignalCommands::Detect {
            lead_id,
            materialize,
        } => {
            let lead = contacts
                .lead(&lead_id)
                .ok_or_else(|| anyhow!("lead '{lead_id}' not found in the contact store"))?;
            let candidates = detect_signals(&lead);

            if materialize {
                let mut created = Vec::new();
                for candidate in &candidates {
                    let signal = engine
                        .signals
                        .create_signal(CreateSignalRequest {
                            signal_type: candidate.signal_type.to_string(),
                            lead_id: Some(lead.lead_id.clone()),
                            firm_name: Some(lead.firm_name.clone()),
                            source: "detector".to_string(),
                            metadata: None,
                            notes: Some(candidate.reason.clone()),
                        })
                        .await?;
                    created.push(signal);
                }
                print_json(&created)
            } else {
                print_json(&candidates)
            }
        }
    }
}

async fn run_vendor(
    engine: &Engine,
    contacts: &dyn ContactStore,
    command: VendorCommands,
) -> Result<()> {
    match command {
        VendorCommands::Apply {
            lead_id,
            firm_name,
            contact,
        } => {
            let record = engine
                .vendors
                .submit_application(&lead_id, &firm_name, contact)
                .await?;
            print_json(&record)
        }
        VendorCommands::MarkPending { lead_id } => {
            let record = engine.vendors.mark_pending(&lead_id).await?;
            print_json(&record)
        }
        VendorCommands::Approve { lead_id, date } => {
            let date = date.as_deref().map(parse_date).transpose()?;
            let (outcome, emitted) = engine.approve_vendor(&lead_id, date).await?;
            print_json(&serde_json::json!({
                "record": outcome.record,
                "signals_emitted": emitted.len(),
            }))
        }
        VendorCommands::Reject { lead_id, reason } => {
            let record = engine.vendors.reject_vendor(&lead_id, &reason).await?;
            print_json(&record)
        }
        VendorCommands::Expire { lead_id } => {
            let record = engine.vendors.expire_vendor(&lead_id).await?;
            print_json(&record)
        }
        VendorCommands::Alerts => {
            let leads = contacts.all_leads();
            let alerts = engine.vendors.vendor_alerts(&leads).await?;
            print_json(&alerts)
        }
        VendorCommands::Summary => {
            let summary = engine.vendors.vendor_summary().await?;
            print_json(&summary)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse an RFC 3339 timestamp or a bare YYYY-MM-DD date (midnight UTC)
fn parse_date(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("'{input}' is not an RFC 3339 timestamp or YYYY-MM-DD date"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid date '{input}'"))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}
