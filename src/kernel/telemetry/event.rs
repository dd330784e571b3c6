use serde::{Deserialize, Serialize};

use crate::kernel::event::{DropReason, FailureStage, TurnOrigin};
use crate::kernel::status::Status;

// Allowed: Statuses, Origins, Reasons, Durations, Counts
// Forbidden: Text, Audio, Images

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    StatusTransition {
        from: Status,
        to: Status,
        at_ms: u64,
    },

    TurnAccepted {
        origin: TurnOrigin,
    },

    TurnDropped {
        origin: TurnOrigin,
        reason: DropReason,
    },

    TurnFailed {
        origin: TurnOrigin,
        stage: FailureStage,
    },

    TurnCompleted {
        origin: TurnOrigin,
        duration_ms: u64,
    },

    IdlePromptFired {
        quiet_ms: u64,
    },

    /// A backend or playback result arrived for a turn that is no longer in flight.
    StaleResultDiscarded,
}
