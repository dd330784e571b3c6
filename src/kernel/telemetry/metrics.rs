use std::collections::VecDeque;

use super::event::TelemetryEvent;
use crate::kernel::event::{DropReason, FailureStage};
use crate::kernel::status::Status;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub turn_stats: TurnStats,
    pub drop_stats: DropStats,
    pub status_stats: StatusStats,
}

#[derive(Debug, Clone, Default)]
pub struct TurnStats {
    pub accepted: u64,
    pub completed: u64,
    pub dispatch_failures: u64,
    pub playback_failures: u64,
    pub idle_prompts: u64,
    pub stale_results: u64,
    pub total_turn_ms: u64,
    pub avg_turn_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DropStats {
    pub total: u64,
    pub busy: u64,
    pub paused: u64,
    pub quiet_hours: u64,
    pub not_idle: u64,
    pub empty: u64,
}

#[derive(Debug, Clone, Default)]
pub struct StatusStats {
    pub transitions: u64,
    pub errors_entered: u64,
    pub sleeps_entered: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::StatusTransition { to, .. } => {
                snap.status_stats.transitions += 1;
                match to {
                    Status::Error => snap.status_stats.errors_entered += 1,
                    Status::Sleeping => snap.status_stats.sleeps_entered += 1,
                    _ => {}
                }
            }
            TelemetryEvent::TurnAccepted { .. } => snap.turn_stats.accepted += 1,
            TelemetryEvent::TurnDropped { reason, .. } => {
                snap.drop_stats.total += 1;
                match reason {
                    DropReason::Busy => snap.drop_stats.busy += 1,
                    DropReason::Paused => snap.drop_stats.paused += 1,
                    DropReason::QuietHours => snap.drop_stats.quiet_hours += 1,
                    DropReason::NotIdle => snap.drop_stats.not_idle += 1,
                    DropReason::Empty => snap.drop_stats.empty += 1,
                }
            }
            TelemetryEvent::TurnFailed { stage, .. } => match stage {
                FailureStage::Dispatch => snap.turn_stats.dispatch_failures += 1,
                FailureStage::Playback => snap.turn_stats.playback_failures += 1,
            },
            TelemetryEvent::TurnCompleted { duration_ms, .. } => {
                snap.turn_stats.completed += 1;
                snap.turn_stats.total_turn_ms += duration_ms;
            }
            TelemetryEvent::IdlePromptFired { .. } => snap.turn_stats.idle_prompts += 1,
            TelemetryEvent::StaleResultDiscarded => snap.turn_stats.stale_results += 1,
        }
    }

    if snap.turn_stats.completed > 0 {
        snap.turn_stats.avg_turn_ms =
            snap.turn_stats.total_turn_ms as f64 / snap.turn_stats.completed as f64;
    }

    snap
}

/// Status sequence walked by the recorded transitions, starting from the first `from`.
pub fn status_trail(events: &VecDeque<TelemetryEvent>) -> Vec<Status> {
    let mut trail = Vec::new();
    for event in events {
        if let TelemetryEvent::StatusTransition { from, to, .. } = event {
            if trail.is_empty() {
                trail.push(*from);
            }
            trail.push(*to);
        }
    }
    trail
}
