use std::fmt;

use serde::{Deserialize, Serialize};

/// The observable lifecycle state of the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    /// Listening, no turn in flight.
    #[default]
    Idle,
    /// A request has been dispatched to the backend.
    Thinking,
    /// The reply is being synthesized or played back.
    Speaking,
    /// Display-only variant of Idle while interim speech is arriving.
    Recognizing,
    /// Quiet hours. Triggers and idle prompts are ignored.
    Sleeping,
    /// Transient failure marker. Always followed by Idle.
    Error,
}

impl Status {
    /// Idle or its display variant.
    pub fn accepts_turns(&self) -> bool {
        matches!(self, Status::Idle | Status::Recognizing)
    }

    /// A turn is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Status::Thinking | Status::Speaking)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Idle => "Idle",
            Status::Thinking => "Thinking...",
            Status::Speaking => "Speaking",
            Status::Recognizing => "Recognizing...",
            Status::Sleeping => "Sleeping (Zzz...)",
            Status::Error => "Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Requests for a status transition. The graph decides whether they apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRequest {
    TurnAccepted,
    ReplyReceived,
    TurnFailed,
    Recovered,
    PlaybackEnded,
    QuietBegan,
    QuietEnded,
    InterimHeard,
    InterimCleared,
}

pub struct StatusGraph;

impl StatusGraph {
    /// Pure function: (Current Status, Request) -> New Status.
    /// Returns None if the request does not apply in the current status.
    pub fn transition(current: Status, request: StatusRequest) -> Option<Status> {
        use Status::*;
        use StatusRequest::*;

        match (current, request) {
            (Idle | Recognizing, TurnAccepted) => Some(Thinking),

            (Thinking, ReplyReceived) => Some(Speaking),
            (Speaking, PlaybackEnded) => Some(Idle),

            (Thinking | Speaking, TurnFailed) => Some(Error),
            (Error, Recovered) => Some(Idle),

            // The gate never preempts a turn in flight.
            (Idle | Recognizing, QuietBegan) => Some(Sleeping),
            (Sleeping, QuietEnded) => Some(Idle),

            (Idle, InterimHeard) => Some(Recognizing),
            (Recognizing, InterimCleared) => Some(Idle),

            _ => None,
        }
    }
}
