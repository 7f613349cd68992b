// ABOUTME: Error types for release and rollback pipelines.
// ABOUTME: Failures carry the step, command, stderr, and exit status that caused them.

use super::step::Step;
use serde::Serialize;
use std::fmt;

/// Details of the remote operation that failed a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: Step,
    pub command: String,
    pub stderr: String,
    /// `None` when the command never reported an exit status.
    pub exit_status: Option<u32>,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} failed running `{}`", self.step, self.command)?;
        if let Some(code) = self.exit_status {
            write!(f, " (exit status {})", code)?;
        }
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr)?;
        }
        Ok(())
    }
}

/// Errors that end a release or rollback run.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A remote command failed, exited non-zero, or timed out.
    #[error("remote command failed: {0}")]
    RemoteExec(StepFailure),

    /// Uploading the artifact failed.
    #[error("artifact transfer failed: {0}")]
    Transfer(StepFailure),

    /// Rollback found no release other than the live one.
    #[error("no previous release to roll back to")]
    NoPreviousRelease,
}

/// Error categories for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployErrorKind {
    RemoteExec,
    Transfer,
    NoPreviousRelease,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::RemoteExec(_) => DeployErrorKind::RemoteExec,
            DeployError::Transfer(_) => DeployErrorKind::Transfer,
            DeployError::NoPreviousRelease => DeployErrorKind::NoPreviousRelease,
        }
    }

    /// The failing operation, when there was one.
    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            DeployError::RemoteExec(failure) | DeployError::Transfer(failure) => Some(failure),
            DeployError::NoPreviousRelease => None,
        }
    }

    /// The step the run stopped at.
    pub fn step(&self) -> Step {
        match self {
            DeployError::RemoteExec(failure) | DeployError::Transfer(failure) => failure.step,
            DeployError::NoPreviousRelease => Step::FindPreviousRelease,
        }
    }
}
