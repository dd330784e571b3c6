use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Facial expression vocabulary understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
}

impl Expression {
    pub const ALL: [Expression; 6] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Angry,
        Expression::Sad,
        Expression::Relaxed,
        Expression::Surprised,
    ];

    /// Everything except the neutral reset.
    pub const EXPRESSIVE: [Expression; 5] = [
        Expression::Happy,
        Expression::Angry,
        Expression::Sad,
        Expression::Relaxed,
        Expression::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Angry => "angry",
            Expression::Sad => "sad",
            Expression::Relaxed => "relaxed",
            Expression::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown expression '{0}'")]
pub struct UnknownExpression(pub String);

impl FromStr for Expression {
    type Err = UnknownExpression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownExpression(s.to_string()))
    }
}

/// Screen placement of the avatar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Default for Position {
    fn default() -> Self {
        Position { x: 0.0, y: -0.6 }
    }
}

/// Commands sent to the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvatarCommand {
    Position(Position),
    Expression(Expression),
    /// Drives mouth movement.
    Speaking(bool),
}

/// The rendering subsystem, however it draws.
pub trait AvatarSink: Send {
    fn apply(&mut self, command: AvatarCommand);
}
