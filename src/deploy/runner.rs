// ABOUTME: Sequential remote command execution for pipeline steps.
// ABOUTME: Turns transport errors, timeouts, and non-zero exits into step failures.

use super::error::{DeployError, StepFailure};
use super::host::RemoteHost;
use super::step::Step;
use crate::events::{Event, SharedSink};
use crate::ssh::{self, CommandOutput};
use std::path::Path;

/// Runs commands for one pipeline, one at a time.
///
/// Every call awaits the command's exit status and end of output before it
/// returns, so later steps observe the effects of earlier ones.
pub struct CommandRunner<'a> {
    host: &'a dyn RemoteHost,
    events: SharedSink,
}

impl<'a> CommandRunner<'a> {
    pub fn new(host: &'a dyn RemoteHost, events: SharedSink) -> Self {
        Self { host, events }
    }

    pub fn events(&self) -> &SharedSink {
        &self.events
    }

    /// Run `command` for `step`. A non-zero exit status is a failure.
    pub async fn run(&self, step: Step, command: &str) -> Result<CommandOutput, DeployError> {
        self.events.emit(Event::Command {
            step,
            command: command.to_string(),
        });
        tracing::debug!(%step, "REMOTE: {}", command);

        let output = match self.host.exec(command).await {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(%step, "command did not complete: {}", e);
                return Err(DeployError::RemoteExec(StepFailure {
                    step,
                    command: command.to_string(),
                    stderr: e.to_string(),
                    exit_status: None,
                }));
            }
        };

        if !output.stdout.is_empty() {
            tracing::debug!(%step, "STDOUT: {}", output.stdout.trim_end());
        }
        if !output.stderr.is_empty() {
            tracing::debug!(%step, "STDERR: {}", output.stderr.trim_end());
        }
        self.events.emit(Event::CommandOutput {
            step,
            exit_code: output.exit_code,
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
        });

        if output.success() {
            Ok(output)
        } else {
            Err(DeployError::RemoteExec(StepFailure {
                step,
                command: command.to_string(),
                stderr: output.stderr.trim().to_string(),
                exit_status: Some(output.exit_code),
            }))
        }
    }

    /// Run `command` and hand back its standard output.
    pub async fn run_for_output(&self, step: Step, command: &str) -> Result<String, DeployError> {
        self.run(step, command).await.map(|output| output.stdout)
    }

    /// Copy `local` into `remote_dir`.
    pub async fn upload(&self, step: Step, local: &Path, remote_dir: &str) -> Result<(), DeployError> {
        let description = format!("upload {} to {}", local.display(), remote_dir);
        self.events.emit(Event::Command {
            step,
            command: description.clone(),
        });
        tracing::debug!(%step, "SCP FROM LOCAL: {} TO REMOTE: {}", local.display(), remote_dir);

        self.host.upload(local, remote_dir).await.map_err(|e| {
            DeployError::Transfer(StepFailure {
                step,
                command: description,
                stderr: e.to_string(),
                exit_status: None,
            })
        })
    }

    pub async fn close(&self) -> ssh::Result<()> {
        self.host.close().await
    }
}
