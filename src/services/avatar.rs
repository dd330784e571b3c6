use tracing::info;

use crate::kernel::avatar::{AvatarCommand, AvatarSink, Expression, Position};

/// Stand-in renderer: remembers the last pose and logs every change.
#[derive(Debug, Clone, Default)]
pub struct TracingAvatar {
    pub position: Position,
    pub expression: Expression,
    pub speaking: bool,
}

impl TracingAvatar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AvatarSink for TracingAvatar {
    fn apply(&mut self, command: AvatarCommand) {
        match command {
            AvatarCommand::Position(position) => {
                info!("[AVATAR] position ({:.1}, {:.1})", position.x, position.y);
                self.position = position;
            }
            AvatarCommand::Expression(expression) => {
                info!("[AVATAR] expression {}", expression);
                self.expression = expression;
            }
            AvatarCommand::Speaking(speaking) => {
                self.speaking = speaking;
            }
        }
    }
}
