use crate::chat::{ChatError, ChatHandle, ChatService};
use crate::event::{StreamEvent, TurnId};
use std::collections::VecDeque;
use std::sync::{mpsc, Arc, Mutex};
use tracing::debug;

/// One scripted reaction to a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Stream these fragments, then complete.
    Reply(Vec<String>),
    /// Stream these fragments, then fail.
    FailAfter(Vec<String>, String),
    /// Emit nothing; the turn stays in flight.
    Silent,
}

impl ScriptStep {
    pub fn reply<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Reply(fragments.into_iter().map(Into::into).collect())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::FailAfter(Vec::new(), message.into())
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    steps: VecDeque<ScriptStep>,
    system_instructions: Vec<String>,
    prompts: Vec<String>,
    unavailable: Option<String>,
}

/// In-process chat service with a queue of scripted replies.
///
/// Used offline when no chat bridge is configured, and by tests. When the
/// queue is empty it answers with a short guiding question.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChatService {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedChatService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        let service = Self::new();
        for step in steps {
            service.push(step);
        }
        service
    }

    /// A service whose `open` always fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let service = Self::new();
        service.lock().unavailable = Some(reason.into());
        service
    }

    pub fn push(&self, step: ScriptStep) {
        self.lock().steps.push_back(step);
    }

    pub fn system_instructions(&self) -> Vec<String> {
        self.lock().system_instructions.clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        // Poisoning only happens if a test panicked mid-update; the data is
        // still usable for inspection.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChatService for ScriptedChatService {
    fn name(&self) -> &str {
        "offline"
    }

    fn open(
        &self,
        system_instruction: &str,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Box<dyn ChatHandle>, ChatError> {
        let mut state = self.lock();
        if let Some(reason) = &state.unavailable {
            return Err(ChatError::Unavailable(reason.clone()));
        }
        state
            .system_instructions
            .push(system_instruction.to_string());
        Ok(Box::new(ScriptedHandle {
            service: self.clone(),
            events,
        }))
    }
}

struct ScriptedHandle {
    service: ScriptedChatService,
    events: mpsc::Sender<StreamEvent>,
}

impl ChatHandle for ScriptedHandle {
    fn send(&mut self, turn: TurnId, prompt: String) -> Result<(), ChatError> {
        let step = {
            let mut state = self.service.lock();
            let step = state
                .steps
                .pop_front()
                .unwrap_or_else(|| ScriptStep::Reply(default_reply(&prompt)));
            state.prompts.push(prompt);
            step
        };
        debug!(turn, ?step, "scripted reply");

        let (fragments, terminal) = match step {
            ScriptStep::Silent => return Ok(()),
            ScriptStep::Reply(fragments) => (fragments, StreamEvent::Completed { turn }),
            ScriptStep::FailAfter(fragments, message) => {
                (fragments, StreamEvent::Failed { turn, message })
            }
        };
        for text in fragments {
            self.events
                .send(StreamEvent::Fragment { turn, text })
                .map_err(|_| ChatError::Closed)?;
        }
        self.events.send(terminal).map_err(|_| ChatError::Closed)
    }
}

fn default_reply(prompt: &str) -> Vec<String> {
    let question = prompt
        .split_once("User Question: ")
        .map_or(prompt, |(_, question)| question)
        .trim();
    let reply = if question.ends_with('?') {
        "Good question. Before we use a formula, which measurements do you already know, \
         and which one are we trying to find?"
    } else {
        "Let's take it one step at a time. Which quantity in the problem would you name first?"
    };
    reply
        .split_inclusive(' ')
        .map(str::to_string)
        .collect()
}
