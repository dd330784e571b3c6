//! Checks run on every idle-timer tick. The orchestrator composes them; the quiet
//! check short-circuits the other two when the gate is closed.

use rand::Rng;

use super::avatar::Expression;
use super::status::Status;
use super::time::ActivityClock;
use crate::config::Configuration;

/// Chance per tick that an idle avatar shows a non-neutral expression.
pub const EXPRESSION_CHANGE_CHANCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dormancy {
    Asleep,
    Awake,
}

pub struct QuietCheck;

impl QuietCheck {
    pub fn evaluate(config: &Configuration, hour: u8) -> Dormancy {
        if config.is_quiet(hour) {
            Dormancy::Asleep
        } else {
            Dormancy::Awake
        }
    }
}

pub struct AutoSpeakCheck;

impl AutoSpeakCheck {
    /// True once quiescence strictly exceeds the configured interval.
    pub fn due(config: &Configuration, status: Status, activity: &ActivityClock, now_ms: u64) -> bool {
        config.auto_speak_enabled
            && status.accepts_turns()
            && !config.waiting_mode
            && activity.quiet_for(now_ms) > config.auto_speak_threshold_ms()
    }
}

pub struct ExpressionCheck;

impl ExpressionCheck {
    pub fn pick<R: Rng + ?Sized>(rng: &mut R) -> Expression {
        if rng.gen_bool(EXPRESSION_CHANGE_CHANCE) {
            Expression::EXPRESSIVE[rng.gen_range(0..Expression::EXPRESSIVE.len())]
        } else {
            Expression::Neutral
        }
    }
}
