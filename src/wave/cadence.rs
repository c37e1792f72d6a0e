//! Persona-driven content cadence templates
//!
//! Each persona maps to a touch sequence plus the reply window and touch cap
//! the orchestrator enforces. Unknown personas fall back to the default
//! template so wave creation never fails on a persona name.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::error::EngineError;

/// Outbound channel for one cadence step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchChannel {
    Mailer,
    Email,
    Call,
    Linkedin,
}

impl FromStr for TouchChannel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mailer" => Ok(Self::Mailer),
            "email" => Ok(Self::Email),
            "call" => Ok(Self::Call),
            "linkedin" => Ok(Self::Linkedin),
            other => Err(EngineError::validation_field(
                "channel",
                format!("unknown touch channel '{other}'"),
            )),
        }
    }
}

/// One planned touch in a cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchStep {
    /// Days after wave start this touch is planned for
    pub day_offset: i64,
    pub channel: TouchChannel,
    pub theme: String,
}

/// Content cadence attached to a wave at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadencePlan {
    pub persona: String,
    /// Reply window applied after each touch
    pub reply_expected_days: i64,
    /// Touches before a target is eligible for a kill/keep decision
    pub max_touches: u32,
    pub steps: Vec<TouchStep>,
}

impl CadencePlan {
    /// Resolve the template for a persona, falling back to the default
    pub fn for_persona(persona: &str, default_reply_days: i64, default_max_touches: u32) -> Self {
        match persona {
            "Risk-Averse Principal" => Self {
                persona: persona.to_string(),
                reply_expected_days: 7,
                max_touches: 3,
                steps: vec![
                    step(0, TouchChannel::Mailer, "proof points and peer references"),
                    step(7, TouchChannel::Email, "case study follow-up"),
                    step(14, TouchChannel::Call, "direct check-in"),
                ],
            },
            "Growth-Stage Operator" => Self {
                persona: persona.to_string(),
                reply_expected_days: 5,
                max_touches: 3,
                steps: vec![
                    step(0, TouchChannel::Mailer, "outcome benchmarks"),
                    step(5, TouchChannel::Linkedin, "founder-to-founder note"),
                    step(10, TouchChannel::Call, "direct check-in"),
                ],
            },
            other => {
                debug!(persona = other, "unknown persona, using default cadence");
                Self {
                    persona: other.to_string(),
                    reply_expected_days: default_reply_days,
                    max_touches: default_max_touches,
                    steps: vec![
                        step(0, TouchChannel::Mailer, "proof-point mailer"),
                        step(default_reply_days, TouchChannel::Email, "follow-up"),
                        step(default_reply_days * 2, TouchChannel::Call, "final check-in"),
                    ],
                }
            }
        }
    }
}

fn step(day_offset: i64, channel: TouchChannel, theme: &str) -> TouchStep {
    TouchStep {
        day_offset,
        channel,
        theme: theme.to_string(),
    }
}
