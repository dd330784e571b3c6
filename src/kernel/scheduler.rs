use super::avatar::AvatarCommand;
use super::event::{TurnId, TurnRequest};
use super::log::LogEntry;
use super::status::Status;

/// Work the driver performs on behalf of the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Status(Status),
    DispatchChat {
        turn: TurnId,
        message: String,
        system_prompt: String,
    },
    DispatchVision {
        turn: TurnId,
        image: Vec<u8>,
    },
    /// Synthesize and play back a reply.
    Speak {
        turn: TurnId,
        text: String,
    },
    Avatar(AvatarCommand),
    StartListening,
    AutoRestart(bool),
    /// Interim recognition text for display; None clears it.
    Interim(Option<String>),
    Logged(LogEntry),
}

pub struct Scheduler;

impl Scheduler {
    /// Pure Projection: accepted request -> backend dispatch.
    pub fn schedule(&self, request: TurnRequest, turn: TurnId, system_prompt: &str) -> SideEffect {
        match request.image {
            Some(image) => SideEffect::DispatchVision { turn, image },
            None => SideEffect::DispatchChat {
                turn,
                message: request.text.trim().to_string(),
                system_prompt: system_prompt.to_string(),
            },
        }
    }
}
