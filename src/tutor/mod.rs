//! Tutoring session: transcript, per-turn retrieval and streamed replies.

use crate::chat::{ChatHandle, ChatService};
use crate::event::{StreamEvent, TurnId};
use crate::knowledge::retrieve;
use crate::problem::ProblemContext;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;

pub use prompts::{CONNECTION_ERROR_MESSAGE, EMPTY_REPLY_MESSAGE};

/// Pause between accepting a question and streaming the reply, so the UI
/// can show that context is being looked up.
pub const DEFAULT_RETRIEVAL_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Ai,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
    pub pending: bool,
}

impl ChatMessage {
    fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
            pending: false,
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            pending: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Ready,
    Retrieving,
    Streaming,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Retrieving => "retrieving",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
        }
    }
}

/// What a session transition changed in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    QuestionAccepted { index: usize },
    ReplyStarted { index: usize },
    FragmentApplied { index: usize },
    ReplyCompleted,
    ReplyFailed { index: usize },
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnRejected {
    #[error("message is empty")]
    Empty,
    #[error("a reply is already in progress ({0})")]
    Busy(&'static str),
    #[error("session is closed")]
    Closed,
}

pub struct TutorSession {
    context: ProblemContext,
    transcript: Vec<ChatMessage>,
    handle: Option<Box<dyn ChatHandle>>,
    events: Receiver<StreamEvent>,
    state: SessionState,
    turn: TurnId,
    question: Option<String>,
    retrieval_started: Option<Instant>,
    retrieval_delay: Duration,
}

impl TutorSession {
    /// Open a remote chat primed for `context` and post the opening question.
    ///
    /// A service that cannot be reached does not prevent the session from
    /// starting; each turn then ends with the connection error message.
    pub fn start(context: ProblemContext, service: &dyn ChatService) -> Self {
        let (tx, rx) = mpsc::channel();
        let mut session = Self {
            context,
            transcript: Vec::new(),
            handle: None,
            events: rx,
            state: SessionState::Initializing,
            turn: 0,
            question: None,
            retrieval_started: None,
            retrieval_delay: DEFAULT_RETRIEVAL_DELAY,
        };

        let instruction = prompts::system_instruction(&session.context);
        match service.open(&instruction, tx) {
            Ok(handle) => session.handle = Some(handle),
            Err(err) => warn!(service = service.name(), "failed to open chat: {err}"),
        }

        session
            .transcript
            .push(ChatMessage::ai(prompts::opening_message(&session.context)));
        session.state = SessionState::Ready;
        info!(
            kind = %session.context.kind(),
            service = service.name(),
            "tutoring session started"
        );
        session
    }

    pub fn with_retrieval_delay(mut self, delay: Duration) -> Self {
        self.retrieval_delay = delay;
        self
    }

    pub fn context(&self) -> &ProblemContext {
        &self.context
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Sending is only possible between turns.
    pub fn can_send(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Accept a learner question. Nothing changes when it is rejected.
    pub fn submit(&mut self, text: &str) -> Result<SessionChange, TurnRejected> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Closed => return Err(TurnRejected::Closed),
            other => return Err(TurnRejected::Busy(other.as_str())),
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(TurnRejected::Empty);
        }

        self.transcript.push(ChatMessage::user(text));
        self.question = Some(text.to_string());
        self.retrieval_started = Some(Instant::now());
        self.state = SessionState::Retrieving;
        debug!(chars = text.len(), "question accepted");
        Ok(SessionChange::QuestionAccepted {
            index: self.transcript.len() - 1,
        })
    }

    /// Whether the retrieval pause for the current question has elapsed.
    pub fn retrieval_due(&self, now: Instant) -> bool {
        match (self.state, self.retrieval_started) {
            (SessionState::Retrieving, Some(started)) => {
                now.saturating_duration_since(started) >= self.retrieval_delay
            }
            _ => false,
        }
    }

    /// Look up context for the pending question and dispatch the augmented
    /// prompt. An empty AI message is appended to receive the reply.
    pub fn stream_reply(&mut self) -> Result<SessionChange, TurnRejected> {
        match self.state {
            SessionState::Retrieving => {}
            SessionState::Closed => return Err(TurnRejected::Closed),
            other => return Err(TurnRejected::Busy(other.as_str())),
        }
        let question = self.question.take().unwrap_or_default();
        self.retrieval_started = None;

        let retrieved = retrieve(&question, self.context.kind());
        let prompt = prompts::augmented_prompt(&retrieved, &question);

        self.turn += 1;
        self.transcript.push(ChatMessage {
            speaker: Speaker::Ai,
            text: String::new(),
            pending: true,
        });
        self.state = SessionState::Streaming;
        let index = self.transcript.len() - 1;
        debug!(turn = self.turn, prompt_chars = prompt.len(), "dispatching prompt");

        let dispatched = match self.handle.as_mut() {
            Some(handle) => handle.send(self.turn, prompt).map_err(|err| err.to_string()),
            None => Err("chat service unavailable".to_string()),
        };
        if let Err(message) = dispatched {
            return Ok(self.fail_turn(&message));
        }
        Ok(SessionChange::ReplyStarted { index })
    }

    /// Submit and stream immediately, skipping the retrieval pause.
    pub fn ask(&mut self, text: &str) -> Result<SessionChange, TurnRejected> {
        self.submit(text)?;
        self.stream_reply()
    }

    pub fn apply(&mut self, event: StreamEvent) -> SessionChange {
        if self.state != SessionState::Streaming || event.turn() != self.turn {
            debug!(turn = event.turn(), current = self.turn, "ignoring stale chat event");
            return SessionChange::Ignored;
        }

        match event {
            StreamEvent::Fragment { text, .. } => match self.transcript.last_mut() {
                Some(message) if message.pending => {
                    message.text.push_str(&text);
                    SessionChange::FragmentApplied {
                        index: self.transcript.len() - 1,
                    }
                }
                _ => SessionChange::Ignored,
            },
            StreamEvent::Completed { .. } => {
                if let Some(message) = self.transcript.last_mut() {
                    message.pending = false;
                    if message.speaker == Speaker::Ai && message.text.is_empty() {
                        message.text = EMPTY_REPLY_MESSAGE.to_string();
                    }
                }
                self.state = SessionState::Ready;
                debug!(turn = self.turn, "reply completed");
                SessionChange::ReplyCompleted
            }
            StreamEvent::Failed { message, .. } => self.fail_turn(&message),
        }
    }

    /// Apply every event that has arrived so far, in arrival order.
    pub fn pump(&mut self) -> Vec<SessionChange> {
        let mut changes = Vec::new();
        loop {
            match self.events.try_recv() {
                Ok(event) => changes.push(self.apply(event)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state == SessionState::Streaming {
                        changes.push(self.fail_turn("chat event channel disconnected"));
                    }
                    break;
                }
            }
        }
        changes
    }

    /// Tear down the remote chat, abandoning any reply still streaming, and
    /// discard the transcript.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.state == SessionState::Streaming {
            info!(turn = self.turn, "closing session with reply in flight");
        }
        self.handle = None;
        self.transcript.clear();
        self.question = None;
        self.retrieval_started = None;
        self.state = SessionState::Closed;
    }

    fn fail_turn(&mut self, reason: &str) -> SessionChange {
        warn!(turn = self.turn, "chat reply failed: {reason}");
        let index = match self.transcript.last_mut() {
            Some(message) if message.pending && message.text.is_empty() => {
                message.text = CONNECTION_ERROR_MESSAGE.to_string();
                message.pending = false;
                self.transcript.len() - 1
            }
            last => {
                if let Some(message) = last {
                    message.pending = false;
                }
                self.transcript.push(ChatMessage::ai(CONNECTION_ERROR_MESSAGE));
                self.transcript.len() - 1
            }
        };
        self.state = SessionState::Ready;
        SessionChange::ReplyFailed { index }
    }
}

impl Drop for TutorSession {
    fn drop(&mut self) {
        self.close();
    }
}
