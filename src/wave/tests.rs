//! Tests for the wave orchestrator and target state machine

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

use crate::clock::{Clock, FixedClock};
use crate::config::EngineConfig;
use crate::effects::Effect;
use crate::leads::{
    LeadSnapshot, LeadTier, SnapshotScorer, StaticContactStore, StaticProofMatcher,
};
use crate::signal::Priority;

use super::*;

fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 5, 9, 0, 0).unwrap()
}

fn lead(id: &str, tier: LeadTier) -> LeadSnapshot {
    LeadSnapshot {
        lead_id: id.to_string(),
        firm_name: format!("{id} Holdings"),
        tier,
        score: 64,
        deal_value: None,
        relationship: None,
        last_touch_date: None,
    }
}

fn setup(leads: Vec<LeadSnapshot>) -> (TempDir, Arc<FixedClock>, WaveOrchestrator) {
    setup_with(leads, EngineConfig::default())
}

fn setup_with(
    leads: Vec<LeadSnapshot>,
    mut config: EngineConfig,
) -> (TempDir, Arc<FixedClock>, WaveOrchestrator) {
    let dir = TempDir::new().unwrap();
    config.storage_root = dir.path().to_path_buf();
    let clock = Arc::new(FixedClock::at(instant()));
    let orchestrator = WaveOrchestrator::new(
        config,
        Arc::new(StaticContactStore::new(leads)),
        Arc::new(SnapshotScorer),
        Arc::new(StaticProofMatcher::default()),
        clock.clone(),
    )
    .expect("orchestrator should open");
    (dir, clock, orchestrator)
}

async fn wave_of_three(orchestrator: &WaveOrchestrator) -> Wave {
    orchestrator
        .create_wave(
            "Q2 principals",
            "Risk-Averse Principal",
            None,
            &["L1".to_string(), "L2".to_string(), "L3".to_string()],
        )
        .await
        .unwrap()
}

fn three_leads() -> Vec<LeadSnapshot> {
    vec![
        lead("L1", LeadTier::A),
        lead("L2", LeadTier::B),
        lead("L3", LeadTier::C),
    ]
}

#[test]
fn test_touch_advances_and_caps() {
    assert_eq!(TargetState::Cold.advance_touch(), Some(TargetState::ProofSent));
    assert_eq!(
        TargetState::ProofSent.advance_touch(),
        Some(TargetState::FollowUp1)
    );
    assert_eq!(
        TargetState::FollowUp1.advance_touch(),
        Some(TargetState::FollowUp2)
    );
    // Caps at FOLLOW_UP_2, never wraps
    assert_eq!(
        TargetState::FollowUp2.advance_touch(),
        Some(TargetState::FollowUp2)
    );
    assert_eq!(TargetState::ReplyReceived.advance_touch(), None);
    assert_eq!(TargetState::Killed.advance_touch(), None);
}

#[test]
fn test_terminal_states() {
    assert!(TargetState::Killed.is_terminal());
    assert!(TargetState::Nurture.is_terminal());
    assert!(!TargetState::Qualified.is_terminal());
    assert!(!TargetState::Cold.is_terminal());
}

#[tokio::test]
async fn test_create_wave_snapshots_cold_targets() {
    let (_dir, _clock, orchestrator) = setup(three_leads());

    let wave = wave_of_three(&orchestrator).await;

    assert_eq!(wave.targets.len(), 3);
    assert!(wave.targets.iter().all(|t| t.state == TargetState::Cold));
    assert!(wave.targets.iter().all(|t| t.touch_count == 0));
    assert_eq!(wave.status, WaveStatus::Active);
    assert_eq!(wave.end_date, wave.start_date + Duration::days(42));
    assert_eq!(wave.cadence.persona, "Risk-Averse Principal");
    assert_eq!(wave.stats.targets, 3);
}

#[tokio::test]
async fn test_create_wave_caps_cohort_size() {
    let config = EngineConfig {
        cohort_size: 2,
        ..EngineConfig::default()
    };
    let (_dir, _clock, orchestrator) = setup_with(three_leads(), config);

    let wave = wave_of_three(&orchestrator).await;
    assert_eq!(wave.targets.len(), 2);
}

#[tokio::test]
async fn test_create_wave_skips_unknown_leads() {
    let (_dir, _clock, orchestrator) = setup(vec![lead("L1", LeadTier::A)]);

    let wave = orchestrator
        .create_wave(
            "Sparse wave",
            "Risk-Averse Principal",
            None,
            &["L1".to_string(), "L404".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(wave.targets.len(), 1);
    assert_eq!(wave.targets[0].lead_id, "L1");
}

#[tokio::test]
async fn test_create_wave_requires_a_name() {
    let (_dir, _clock, orchestrator) = setup(three_leads());

    let err = orchestrator
        .create_wave("  ", "Risk-Averse Principal", None, &[])
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_first_touch_opens_reply_window() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    let update = orchestrator
        .record_touch(&wave.id, "L1", Some(TouchChannel::Mailer), None)
        .await
        .unwrap();

    assert_eq!(update.target.state, TargetState::ProofSent);
    assert_eq!(update.target.touch_count, 1);
    assert_eq!(update.target.last_touch_date, Some(clock.now()));
    assert_eq!(
        update.target.expected_reply_date,
        Some(clock.now() + Duration::days(7))
    );
    assert_eq!(update.next_action.action, ActionKind::WaitForReply);
    assert_eq!(update.next_action.due_in_days, Some(7));
}

#[tokio::test]
async fn test_reply_window_refreshes_on_every_touch() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap();
    clock.advance(Duration::days(8));
    let update = orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap();

    assert_eq!(update.target.state, TargetState::FollowUp1);
    assert_eq!(update.target.touch_count, 2);
    assert_eq!(
        update.target.expected_reply_date,
        Some(clock.now() + Duration::days(7))
    );
}

#[tokio::test]
async fn test_touch_count_survives_the_cadence_cap() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    for _ in 0..4 {
        orchestrator
            .record_touch(&wave.id, "L1", None, None)
            .await
            .unwrap();
        clock.advance(Duration::days(8));
    }

    let stored = orchestrator.get_wave(&wave.id).await.unwrap();
    let target = stored.target("L1").unwrap();
    assert_eq!(target.state, TargetState::FollowUp2);
    assert_eq!(target.touch_count, 4);
    assert_eq!(target.history.len(), 5); // snapshot + 4 touches
}

#[tokio::test]
async fn test_unknown_wave_and_target_are_not_found() {
    let (_dir, _clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    let err = orchestrator
        .record_touch("wave-missing", "L1", None, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = orchestrator
        .record_touch(&wave.id, "L404", None, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_reply_moves_to_reply_received_and_emits_effect() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap();
    clock.advance(Duration::days(2));

    let outcome = orchestrator
        .record_reply(&wave.id, "L1", Some("asked for pricing".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.target.state, TargetState::ReplyReceived);
    assert_eq!(outcome.target.reply_date, Some(clock.now()));
    assert_eq!(outcome.next_action.action, ActionKind::ScheduleMeeting);
    assert_eq!(outcome.next_action.priority, Priority::Urgent);
    assert_eq!(outcome.effects.len(), 1);
    match &outcome.effects[0] {
        Effect::EmitSignal {
            signal_type,
            lead_id,
            ..
        } => {
            assert_eq!(signal_type, "reply_received");
            assert_eq!(lead_id.as_deref(), Some("L1"));
        }
    }
}

#[tokio::test]
async fn test_meeting_requires_a_reply_first() {
    let (_dir, _clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    let err = orchestrator
        .record_meeting(&wave.id, "L1", None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_meeting_then_qualify() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap();
    orchestrator
        .record_reply(&wave.id, "L1", None)
        .await
        .unwrap();

    let meeting_date = clock.now() + Duration::days(3);
    let update = orchestrator
        .record_meeting(&wave.id, "L1", Some(meeting_date))
        .await
        .unwrap();
    assert_eq!(update.target.state, TargetState::MeetingScheduled);
    assert_eq!(update.target.meeting_date, Some(meeting_date));
    assert_eq!(update.next_action.action, ActionKind::PrepareMeeting);
    assert_eq!(update.next_action.due_in_days, Some(1));

    let update = orchestrator.qualify_target(&wave.id, "L1").await.unwrap();
    assert_eq!(update.target.state, TargetState::Qualified);
    assert_eq!(update.next_action.action, ActionKind::None);

    let stored = orchestrator.get_wave(&wave.id).await.unwrap();
    assert_eq!(stored.stats.qualified, 1);
}

async fn exhaust_touches(
    orchestrator: &WaveOrchestrator,
    clock: &FixedClock,
    wave_id: &str,
    lead_id: &str,
) {
    // Three touches, each left to go a day past its reply window
    for _ in 0..3 {
        orchestrator
            .record_touch(wave_id, lead_id, None, None)
            .await
            .unwrap();
        clock.advance(Duration::days(8));
    }
}

#[tokio::test]
async fn test_kill_keep_gate_rejects_early_decisions() {
    let (_dir, _clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    // One touch, window still open: not at the gate
    orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap();
    let err = orchestrator
        .kill_keep_decision(&wave.id, "L1", Decision::Kill, None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_kill_decision_at_the_gate() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    exhaust_touches(&orchestrator, &clock, &wave.id, "L1").await;

    let outcome = orchestrator
        .kill_keep_decision(&wave.id, "L1", Decision::Kill, Some("no fit".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.target.state, TargetState::Killed);
    assert!(outcome.target.killed);

    let stored = orchestrator.get_wave(&wave.id).await.unwrap();
    assert_eq!(stored.stats.killed, 1);
}

#[tokio::test]
async fn test_keep_decision_moves_to_nurture() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    exhaust_touches(&orchestrator, &clock, &wave.id, "L1").await;

    let outcome = orchestrator
        .kill_keep_decision(&wave.id, "L1", Decision::Keep, None)
        .await
        .unwrap();
    assert_eq!(outcome.target.state, TargetState::Nurture);
    assert!(!outcome.target.killed);

    let stored = orchestrator.get_wave(&wave.id).await.unwrap();
    assert_eq!(stored.stats.nurture, 1);
}

#[tokio::test]
async fn test_terminal_targets_reject_further_recording() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    exhaust_touches(&orchestrator, &clock, &wave.id, "L1").await;
    orchestrator
        .kill_keep_decision(&wave.id, "L1", Decision::Kill, None)
        .await
        .unwrap();

    let err = orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    let err = orchestrator
        .record_reply(&wave.id, "L1", None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

fn bare_target(state: TargetState, touch_count: u32) -> Target {
    Target {
        lead_id: "L1".to_string(),
        firm_name: "Acme".to_string(),
        tier: LeadTier::B,
        score: 50,
        state,
        touch_count,
        last_touch_date: None,
        expected_reply_date: None,
        reply_date: None,
        meeting_date: None,
        killed: false,
        history: Vec::new(),
    }
}

#[test]
fn test_next_action_precedence() {
    let now = instant();

    let cold = bare_target(TargetState::Cold, 0);
    assert_eq!(next_action(&cold, 3, now).action, ActionKind::SendProofMailer);

    // Overdue past the touch cap: decision time
    let mut stalled = bare_target(TargetState::FollowUp2, 3);
    stalled.expected_reply_date = Some(now - Duration::days(3));
    assert_eq!(
        next_action(&stalled, 3, now).action,
        ActionKind::KillKeepDecision
    );

    // Overdue under the cap: follow up
    let mut behind = bare_target(TargetState::ProofSent, 1);
    behind.expected_reply_date = Some(now - Duration::days(3));
    assert_eq!(next_action(&behind, 3, now).action, ActionKind::SendFollowUp);

    // Window still open: wait, reporting days until the expected reply
    let mut waiting = bare_target(TargetState::FollowUp1, 2);
    waiting.expected_reply_date = Some(now + Duration::days(4));
    let action = next_action(&waiting, 3, now);
    assert_eq!(action.action, ActionKind::WaitForReply);
    assert_eq!(action.due_in_days, Some(4));

    let replied = bare_target(TargetState::ReplyReceived, 2);
    let action = next_action(&replied, 3, now);
    assert_eq!(action.action, ActionKind::ScheduleMeeting);
    assert_eq!(action.priority, Priority::Urgent);

    let meeting = bare_target(TargetState::MeetingScheduled, 2);
    let action = next_action(&meeting, 3, now);
    assert_eq!(action.action, ActionKind::PrepareMeeting);
    assert_eq!(action.due_in_days, Some(1));

    assert_eq!(
        next_action(&bare_target(TargetState::Killed, 3), 3, now).action,
        ActionKind::None
    );
    assert_eq!(
        next_action(&bare_target(TargetState::Nurture, 3), 3, now).action,
        ActionKind::None
    );
    assert_eq!(
        next_action(&bare_target(TargetState::Qualified, 2), 3, now).action,
        ActionKind::None
    );
}

#[test]
fn test_next_action_is_pure() {
    let now = instant();
    let mut target = bare_target(TargetState::FollowUp1, 2);
    target.expected_reply_date = Some(now - Duration::days(2));

    let first = next_action(&target, 3, now);
    let second = next_action(&target, 3, now);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_dashboard_sorts_overdue_first_and_computes_funnel() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    // L1 goes far overdue; L2 converts reply -> meeting; L3 replies only
    orchestrator
        .record_touch(&wave.id, "L1", None, None)
        .await
        .unwrap();
    orchestrator
        .record_touch(&wave.id, "L2", None, None)
        .await
        .unwrap();
    orchestrator
        .record_touch(&wave.id, "L3", None, None)
        .await
        .unwrap();
    orchestrator
        .record_reply(&wave.id, "L2", None)
        .await
        .unwrap();
    orchestrator
        .record_meeting(&wave.id, "L2", None)
        .await
        .unwrap();
    orchestrator
        .record_reply(&wave.id, "L3", None)
        .await
        .unwrap();

    clock.advance(Duration::days(10));

    let dashboard = orchestrator.wave_dashboard(&wave.id).await.unwrap();

    assert_eq!(dashboard.targets[0].lead_id, "L1");
    assert!(dashboard.targets[0].is_overdue);
    assert_eq!(dashboard.targets[0].days_overdue, 3);
    assert_eq!(
        dashboard.targets[0].next_action.action,
        ActionKind::SendFollowUp
    );

    // replies 2, meetings 1 -> 50%
    assert_eq!(dashboard.reply_to_meeting_pct, 50);
    assert_eq!(dashboard.days_remaining, 32);
}

#[tokio::test]
async fn test_dashboard_pct_guards_divide_by_zero() {
    let (_dir, _clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    let dashboard = orchestrator.wave_dashboard(&wave.id).await.unwrap();
    assert_eq!(dashboard.reply_to_meeting_pct, 0);
}

#[tokio::test]
async fn test_days_remaining_floors_at_zero() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    clock.advance(Duration::days(60));
    let dashboard = orchestrator.wave_dashboard(&wave.id).await.unwrap();
    assert_eq!(dashboard.days_remaining, 0);
}

#[tokio::test]
async fn test_kill_keep_queue_recommends_by_tier() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    exhaust_touches(&orchestrator, &clock, &wave.id, "L1").await; // tier A
    exhaust_touches(&orchestrator, &clock, &wave.id, "L2").await; // tier B

    let queue = orchestrator.kill_keep_queue().await.unwrap();
    assert_eq!(queue.len(), 2);

    let l1 = queue.iter().find(|item| item.lead_id == "L1").unwrap();
    let l2 = queue.iter().find(|item| item.lead_id == "L2").unwrap();
    assert_eq!(l1.recommendation, Decision::Keep);
    assert_eq!(l2.recommendation, Decision::Kill);

    // Advisory only: both targets are still in cadence
    let stored = orchestrator.get_wave(&wave.id).await.unwrap();
    assert!(stored.target("L1").unwrap().state.in_touch_cadence());
    assert!(stored.target("L2").unwrap().state.in_touch_cadence());
}

#[tokio::test]
async fn test_kill_keep_queue_excludes_engaged_targets() {
    let (_dir, clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    exhaust_touches(&orchestrator, &clock, &wave.id, "L1").await;
    orchestrator
        .record_reply(&wave.id, "L1", None)
        .await
        .unwrap();

    let queue = orchestrator.kill_keep_queue().await.unwrap();
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_wave_lifecycle_transitions() {
    let (_dir, _clock, orchestrator) = setup(three_leads());
    let wave = wave_of_three(&orchestrator).await;

    let err = orchestrator.archive_wave(&wave.id).await.unwrap_err();
    assert!(err.is_invalid_transition());

    let completed = orchestrator.complete_wave(&wave.id).await.unwrap();
    assert_eq!(completed.status, WaveStatus::Completed);

    let archived = orchestrator.archive_wave(&wave.id).await.unwrap();
    assert_eq!(archived.status, WaveStatus::Archived);
}
