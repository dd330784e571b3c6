use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::avatar::{Expression, Position};

pub type TurnId = Uuid;

/// Instruction sent when the character has been left alone too long.
pub const IDLE_PROMPT_TEXT: &str = "(The conversation has lapsed for a while. \
Say a short, bored remark to yourself, or ask the user a short question.)";

/// Display placeholder for an idle prompt.
pub const IDLE_PROMPT_PLACEHOLDER: &str = "(auto trigger)";

/// Display placeholder for a camera capture.
pub const VISION_PLACEHOLDER: &str = "(camera capture)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnOrigin {
    UserTyped,
    VoiceTriggered,
    IdlePrompt,
    VisionCapture,
}

/// A producer's bid for a conversational turn. Consumed immediately, never queued.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    pub origin: TurnOrigin,
    pub text: String,
    /// Hide `text` in the conversation log. The backend still receives it.
    pub suppress_from_log: bool,
    /// Captured frame for vision turns.
    pub image: Option<Vec<u8>>,
}

impl TurnRequest {
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            origin: TurnOrigin::UserTyped,
            text: text.into(),
            suppress_from_log: false,
            image: None,
        }
    }

    pub fn voice(text: impl Into<String>) -> Self {
        Self {
            origin: TurnOrigin::VoiceTriggered,
            text: text.into(),
            suppress_from_log: false,
            image: None,
        }
    }

    pub fn idle_prompt() -> Self {
        Self {
            origin: TurnOrigin::IdlePrompt,
            text: IDLE_PROMPT_TEXT.to_string(),
            suppress_from_log: true,
            image: None,
        }
    }

    pub fn vision(image: Vec<u8>) -> Self {
        Self {
            origin: TurnOrigin::VisionCapture,
            text: VISION_PLACEHOLDER.to_string(),
            suppress_from_log: true,
            image: Some(image),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.image {
            Some(image) => image.is_empty(),
            None => self.text.trim().is_empty(),
        }
    }
}

/// Output of the continuous recognition feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Interim(String),
    Final(String),
    /// The listening session terminated.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureStage {
    /// Backend round-trip (chat or vision).
    Dispatch,
    /// Synthesis, decode or audio output.
    Playback,
}

/// Why a turn request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropReason {
    /// Another turn is in flight.
    Busy,
    /// Waiting mode is on.
    Paused,
    /// The quiet-hours gate is closed.
    QuietHours,
    /// Status does not accept turns yet (Sleeping until the next tick).
    NotIdle,
    Empty,
}

/// Explicit user settings actions.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsUpdate {
    TriggerPhrases(String),
    SystemPrompt(String),
    QuietHours { start: u8, end: u8 },
    AutoSpeak { enabled: bool, interval_minutes: u32 },
    WaitingMode(bool),
    ToggleWaitingMode,
    AutoExpression(bool),
    Expression(Expression),
    Position(Position),
    /// Counts as activity.
    BackgroundChanged,
}

/// Everything that reaches the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Recognition(RecognitionEvent),
    UserText(String),
    ImageCaptured(Vec<u8>),
    IdleTick,
    Replied { turn: TurnId, text: String },
    Failed { turn: TurnId, stage: FailureStage, reason: String },
    PlaybackFinished { turn: TurnId },
    Settings(SettingsUpdate),
}

impl Event {
    pub fn heard(text: &str) -> Self {
        Event::Recognition(RecognitionEvent::Final(text.to_string()))
    }

    pub fn hearing(text: &str) -> Self {
        Event::Recognition(RecognitionEvent::Interim(text.to_string()))
    }
}
