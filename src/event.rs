/// Turn identifier assigned by the tutoring session to each outbound prompt.
pub type TurnId = u64;

/// Events a chat backend reports for a streamed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Fragment { turn: TurnId, text: String },
    Completed { turn: TurnId },
    Failed { turn: TurnId, message: String },
}

impl StreamEvent {
    pub fn turn(&self) -> TurnId {
        match self {
            Self::Fragment { turn, .. } | Self::Completed { turn } | Self::Failed { turn, .. } => {
                *turn
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fragment { .. })
    }
}
