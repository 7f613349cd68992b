// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes, and renders pipeline events.

use crate::deploy::StepFailure;
use crate::events::{Event, EventSink, SessionEvent};
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
#[derive(Debug)]
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a warning (JSON mode emits a warning event).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.json_line(&JsonEvent {
                event: "warning",
                message,
                duration_secs: None,
            }),
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                // Print only the essential result
                println!("{message}");
            }
            OutputMode::Json => self.json_line(&JsonEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
            }),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = JsonEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print the details of a failed step.
    pub fn step_failure(&self, failure: &StepFailure) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("  step:    {}", failure.step);
                eprintln!("  command: {}", failure.command);
                if let Some(code) = failure.exit_status {
                    eprintln!("  exit:    {}", code);
                }
                if !failure.stderr.is_empty() {
                    eprintln!("  stderr:  {}", failure.stderr);
                }
            }
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(&StepFailureEvent {
                    event: "step_failure",
                    failure,
                }) {
                    eprintln!("{json}");
                }
            }
        }
    }

    /// Print a serializable result: JSON in JSON mode, `render` otherwise.
    pub fn report<T: Serialize>(&self, value: &T, render: impl FnOnce() -> String) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(value) {
                    println!("{json}");
                }
            }
            OutputMode::Normal | OutputMode::Quiet => println!("{}", render()),
        }
    }

    /// Print the final result of a run: the data as JSON in JSON mode,
    /// `message` otherwise.
    pub fn finish<T: Serialize>(&self, value: &T, message: &str) {
        match self.mode {
            OutputMode::Json => self.json_line(&ResultEvent {
                event: "success",
                message,
                duration_secs: self.duration(),
                result: value,
            }),
            OutputMode::Normal | OutputMode::Quiet => self.success(message),
        }
    }

    fn json_line<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            println!("{json}");
        }
    }
}

impl EventSink for Output {
    fn emit(&self, event: Event) {
        match self.mode {
            OutputMode::Quiet => {}
            OutputMode::Normal => match event {
                Event::Session(SessionEvent::Connecting {
                    host,
                    port,
                    via_proxy,
                }) => {
                    let via = if via_proxy { " (via proxy)" } else { "" };
                    println!("  → Connecting to {}:{}{}...", host, port, via);
                }
                Event::Session(SessionEvent::Ready { host }) => {
                    println!("  → Connected to {}", host);
                }
                Event::Session(SessionEvent::Error { host, message }) => {
                    eprintln!("  ✗ {}: {}", host, message);
                }
                Event::Session(SessionEvent::Closed { host }) => {
                    tracing::debug!("Closed :: {}", host);
                }
                Event::StepStarted(step) => println!("  → {}...", step.description()),
                Event::Cleanup { action } => println!("  ↺ Cleanup: {}", action),
                Event::StepFinished(_) | Event::Command { .. } | Event::CommandOutput { .. } => {}
            },
            OutputMode::Json => {
                if let Some(line) = json_event(&event) {
                    println!("{line}");
                }
            }
        }
    }
}

fn json_event(event: &Event) -> Option<String> {
    let value = match event {
        Event::Session(SessionEvent::Connecting {
            host,
            port,
            via_proxy,
        }) => serde_json::json!({
            "event": "connecting", "host": host, "port": port, "via_proxy": via_proxy
        }),
        Event::Session(SessionEvent::Ready { host }) => {
            serde_json::json!({ "event": "ready", "host": host })
        }
        Event::Session(SessionEvent::Error { host, message }) => {
            serde_json::json!({ "event": "session_error", "host": host, "message": message })
        }
        Event::Session(SessionEvent::Closed { host }) => {
            serde_json::json!({ "event": "closed", "host": host })
        }
        Event::StepStarted(step) => serde_json::json!({ "event": "step_started", "step": step }),
        Event::StepFinished(step) => serde_json::json!({ "event": "step_finished", "step": step }),
        Event::Cleanup { action } => serde_json::json!({ "event": "cleanup", "action": action }),
        Event::Command { .. } | Event::CommandOutput { .. } => return None,
    };
    serde_json::to_string(&value).ok()
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct ResultEvent<'a, T: Serialize> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
    result: &'a T,
}

#[derive(Serialize)]
struct StepFailureEvent<'a> {
    event: &'a str,
    #[serde(flatten)]
    failure: &'a StepFailure,
}
