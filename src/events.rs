// ABOUTME: Structured events emitted by sessions and pipelines.
// ABOUTME: Front ends subscribe through EventSink instead of the core printing anything.

use crate::deploy::Step;
use parking_lot::Mutex;
use std::sync::Arc;

/// Connection lifecycle signals for one SSH session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A TCP (or tunnelled) handshake is starting.
    Connecting {
        host: String,
        port: u16,
        via_proxy: bool,
    },
    /// Handshake and authentication succeeded.
    Ready { host: String },
    /// Connecting or authenticating failed.
    Error { host: String, message: String },
    /// The session was disconnected.
    Closed { host: String },
}

/// Everything the orchestrator reports while it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Session(SessionEvent),
    StepStarted(Step),
    StepFinished(Step),
    /// A remote command is about to run.
    Command { step: Step, command: String },
    /// Captured output of a finished remote command.
    CommandOutput {
        step: Step,
        exit_code: u32,
        stdout: String,
        stderr: String,
    },
    /// A best-effort recovery action after a failed step.
    Cleanup { action: String },
}

/// Receiver for orchestrator events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Shared handle to an event sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

/// Sink that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Only the session lifecycle events.
    pub fn session_events(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Session(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// Steps in the order they started.
    pub fn started_steps(&self) -> Vec<Step> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::StepStarted(step) => Some(*step),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for Recorder {
    fn emit(&self, event: Event) {
        self.events.lock().push(event);
    }
}
