//! Chat service backed by an external bridge process speaking JSON lines.
//!
//! Requests written to the bridge's stdin:
//! `{"type":"system","content":"..."}` once, then
//! `{"type":"prompt","turn":1,"content":"..."}` per user turn.
//!
//! Replies read from its stdout:
//! `{"type":"delta","turn":1,"content":"..."}`, `{"type":"done","turn":1}` or
//! `{"type":"error","turn":1,"message":"..."}`.

use crate::chat::{ChatError, ChatHandle, ChatService};
use crate::event::{StreamEvent, TurnId};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::runtime::Handle;
use tokio::sync::mpsc as async_mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Environment variable the bridge reads its credential from.
pub const BRIDGE_API_KEY_VAR: &str = "SOLIDTUTOR_API_KEY";

const NO_TURN: TurnId = 0;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeRequest<'a> {
    System { content: &'a str },
    Prompt { turn: TurnId, content: &'a str },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BridgeReply {
    Delta { turn: TurnId, content: String },
    Done { turn: TurnId },
    Error {
        #[serde(default)]
        turn: Option<TurnId>,
        message: String,
    },
}

#[derive(Clone)]
pub struct CommandChatService {
    program: String,
    args: Vec<String>,
    api_key: Option<String>,
    runtime_handle: Handle,
}

impl CommandChatService {
    pub fn new(
        command: &[String],
        api_key: Option<String>,
        runtime_handle: Handle,
    ) -> Result<Self, ChatError> {
        let Some((program, args)) = command.split_first() else {
            return Err(ChatError::EmptyCommand);
        };
        if program.trim().is_empty() {
            return Err(ChatError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            api_key,
            runtime_handle,
        })
    }

    /// Uses the runtime the caller is running on.
    pub fn from_current_runtime(
        command: &[String],
        api_key: Option<String>,
    ) -> Result<Self, ChatError> {
        let runtime_handle =
            Handle::try_current().map_err(|err| ChatError::RuntimeUnavailable(err.to_string()))?;
        Self::new(command, api_key, runtime_handle)
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ChatService for CommandChatService {
    fn name(&self) -> &str {
        "bridge"
    }

    fn open(
        &self,
        system_instruction: &str,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Box<dyn ChatHandle>, ChatError> {
        let _guard = self.runtime_handle.enter();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(api_key) = &self.api_key {
            command.env(BRIDGE_API_KEY_VAR, api_key);
        }

        let mut child = command.spawn().map_err(|source| ChatError::Spawn {
            command: self.command_line(),
            source,
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChatError::Protocol("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ChatError::Protocol("bridge stdout unavailable".to_string()))?;
        info!(command = %self.command_line(), "chat bridge started");

        let in_flight = Arc::new(AtomicU64::new(NO_TURN));
        let (line_tx, line_rx) = async_mpsc::unbounded_channel::<String>();

        let writer = self.runtime_handle.spawn(write_lines(
            stdin,
            line_rx,
            events.clone(),
            Arc::clone(&in_flight),
        ));
        let reader = self
            .runtime_handle
            .spawn(read_replies(stdout, events, Arc::clone(&in_flight)));

        let system_line = encode(&BridgeRequest::System {
            content: system_instruction,
        })?;
        line_tx.send(system_line).map_err(|_| ChatError::Closed)?;

        Ok(Box::new(CommandHandle {
            line_tx,
            in_flight,
            tasks: vec![writer, reader],
            _child: child,
        }))
    }
}

struct CommandHandle {
    line_tx: async_mpsc::UnboundedSender<String>,
    in_flight: Arc<AtomicU64>,
    tasks: Vec<JoinHandle<()>>,
    _child: Child,
}

impl ChatHandle for CommandHandle {
    fn send(&mut self, turn: TurnId, prompt: String) -> Result<(), ChatError> {
        let line = encode(&BridgeRequest::Prompt {
            turn,
            content: &prompt,
        })?;
        self.in_flight.store(turn, Ordering::SeqCst);
        self.line_tx.send(line).map_err(|_| {
            self.in_flight.store(NO_TURN, Ordering::SeqCst);
            ChatError::Closed
        })
    }
}

impl Drop for CommandHandle {
    fn drop(&mut self) {
        let pending = self.in_flight.swap(NO_TURN, Ordering::SeqCst);
        if pending != NO_TURN {
            debug!(turn = pending, "aborting in-flight chat turn");
        }
        for task in &self.tasks {
            task.abort();
        }
    }
}

fn encode(request: &BridgeRequest<'_>) -> Result<String, ChatError> {
    serde_json::to_string(request).map_err(|err| ChatError::Protocol(err.to_string()))
}

async fn write_lines(
    mut stdin: tokio::process::ChildStdin,
    mut lines: async_mpsc::UnboundedReceiver<String>,
    events: mpsc::Sender<StreamEvent>,
    in_flight: Arc<AtomicU64>,
) {
    while let Some(mut line) = lines.recv().await {
        line.push('\n');
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(err) => Err(err),
        };
        if let Err(err) = written {
            warn!("chat bridge write failed: {err}");
            fail_in_flight(&events, &in_flight, format!("bridge write failed: {err}"));
            return;
        }
    }
}

async fn read_replies(
    stdout: tokio::process::ChildStdout,
    events: mpsc::Sender<StreamEvent>,
    in_flight: Arc<AtomicU64>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("chat bridge closed stdout");
                fail_in_flight(&events, &in_flight, "bridge exited".to_string());
                return;
            }
            Err(err) => {
                warn!("chat bridge read failed: {err}");
                fail_in_flight(&events, &in_flight, format!("bridge read failed: {err}"));
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<BridgeReply>(&line) {
            Ok(BridgeReply::Delta { turn, content }) => StreamEvent::Fragment {
                turn,
                text: content,
            },
            Ok(BridgeReply::Done { turn }) => {
                let _ = in_flight.compare_exchange(turn, NO_TURN, Ordering::SeqCst, Ordering::SeqCst);
                StreamEvent::Completed { turn }
            }
            Ok(BridgeReply::Error { turn, message }) => {
                let turn = turn.unwrap_or_else(|| in_flight.load(Ordering::SeqCst));
                let _ = in_flight.compare_exchange(turn, NO_TURN, Ordering::SeqCst, Ordering::SeqCst);
                StreamEvent::Failed { turn, message }
            }
            Err(err) => {
                warn!("ignoring malformed bridge line: {err}");
                continue;
            }
        };

        if events.send(event).is_err() {
            debug!("chat event receiver dropped");
            return;
        }
    }
}

fn fail_in_flight(events: &mpsc::Sender<StreamEvent>, in_flight: &AtomicU64, message: String) {
    let turn = in_flight.swap(NO_TURN, Ordering::SeqCst);
    if turn != NO_TURN {
        let _ = events.send(StreamEvent::Failed { turn, message });
    }
}

#[cfg(test)]
mod tests {
    use super::CommandChatService;
    use crate::chat::{ChatError, ChatService};
    use crate::event::StreamEvent;
    use std::sync::mpsc;
    use std::time::Duration;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    async fn collect_until_terminal(rx: &mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for _ in 0..500 {
            while let Ok(event) = rx.try_recv() {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    return events;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        events
    }

    #[test]
    fn empty_command_is_rejected() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime should build");
        assert!(matches!(
            CommandChatService::new(&[], None, runtime.handle().clone()),
            Err(ChatError::EmptyCommand)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bridge_replies_stream_in_order() {
        let script = r#"read -r sys; read -r prompt;
printf '%s\n' '{"type":"delta","turn":1,"content":"Vol"}';
printf '%s\n' 'not json';
printf '%s\n' '{"type":"delta","turn":1,"content":"ume is 10"}';
printf '%s\n' '{"type":"done","turn":1}';
read -r never"#;
        let service = CommandChatService::from_current_runtime(&sh(script), None)
            .expect("service should build");
        let (tx, rx) = mpsc::channel();
        let mut handle = service.open("system", tx).expect("bridge should start");
        handle
            .send(1, "hello".to_string())
            .expect("prompt should queue");

        let events = collect_until_terminal(&rx).await;
        assert_eq!(
            events,
            vec![
                StreamEvent::Fragment {
                    turn: 1,
                    text: "Vol".to_string()
                },
                StreamEvent::Fragment {
                    turn: 1,
                    text: "ume is 10".to_string()
                },
                StreamEvent::Completed { turn: 1 },
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn bridge_exit_mid_turn_fails_the_turn() {
        let service =
            CommandChatService::from_current_runtime(&sh("read -r sys; read -r prompt; exit 0"), None)
                .expect("service should build");
        let (tx, rx) = mpsc::channel();
        let mut handle = service.open("system", tx).expect("bridge should start");
        handle.send(3, "hello".to_string()).expect("prompt should queue");

        let events = collect_until_terminal(&rx).await;
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Failed { turn: 3, .. })
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn dropping_handle_mid_turn_kills_bridge() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let pid_file = dir.path().join("bridge.pid");
        let script = format!(
            "echo $$ > '{}'; read -r sys; read -r prompt; exec sleep 30",
            pid_file.display()
        );
        let service =
            CommandChatService::from_current_runtime(&sh(&script), None).expect("service should build");
        let (tx, rx) = mpsc::channel();
        let mut handle = service.open("system", tx).expect("bridge should start");
        handle.send(1, "hello".to_string()).expect("prompt should queue");

        let mut pid = None;
        for _ in 0..200 {
            if let Ok(raw) = std::fs::read_to_string(&pid_file) {
                if let Ok(parsed) = raw.trim().parse::<u32>() {
                    pid = Some(parsed);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let pid = pid.expect("bridge should report its pid");
        let proc_entry = std::path::PathBuf::from(format!("/proc/{pid}"));
        assert!(proc_entry.exists());

        drop(handle);

        let mut gone = false;
        for _ in 0..300 {
            if !proc_entry.exists() {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(gone, "bridge process {pid} outlived its handle");
        assert!(!matches!(rx.try_recv(), Ok(StreamEvent::Completed { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn missing_program_reports_spawn_error() {
        let service = CommandChatService::from_current_runtime(
            &["/nonexistent/solidtutor-bridge".to_string()],
            None,
        )
        .expect("service should build");
        let (tx, _rx) = mpsc::channel();
        assert!(matches!(
            service.open("system", tx),
            Err(ChatError::Spawn { .. })
        ));
    }
}
