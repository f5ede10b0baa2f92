//! Seam to the remote chat service.
//!
//! A [`ChatService`] opens one [`ChatHandle`] per tutoring session. The handle
//! is owned by the session and dropped on teardown, which aborts whatever is
//! still in flight. Replies arrive as [`StreamEvent`]s on the channel given to
//! `open`, in the order the service produced them.

use crate::event::{StreamEvent, TurnId};
use std::sync::mpsc;
use thiserror::Error;

pub mod command;
pub mod scripted;

pub use command::CommandChatService;
pub use scripted::ScriptedChatService;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to launch chat bridge `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chat bridge command is empty")]
    EmptyCommand,

    #[error("tokio runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("chat session is closed")]
    Closed,

    #[error("chat protocol error: {0}")]
    Protocol(String),

    #[error("chat service unavailable: {0}")]
    Unavailable(String),
}

pub trait ChatService: Send + Sync {
    fn name(&self) -> &str;

    /// Start a remote conversation primed with `system_instruction`.
    fn open(
        &self,
        system_instruction: &str,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Box<dyn ChatHandle>, ChatError>;
}

pub trait ChatHandle: Send {
    /// Dispatch a prompt. The reply streams back as events tagged with `turn`
    /// and ends with exactly one `Completed` or `Failed`.
    fn send(&mut self, turn: TurnId, prompt: String) -> Result<(), ChatError>;
}
