// ABOUTME: Session lifecycle state machine.
// ABOUTME: Guards transitions so commands never overlap on one session.

use super::error::{Error, Result};
use std::fmt;

/// Lifecycle of one SSH session.
///
/// `Connecting → Ready ⇄ Executing`, and any state may move to `Closed`.
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Ready,
    Executing,
    Closed,
}

impl SessionState {
    /// Whether moving from `self` to `next` is allowed.
    pub fn can_transition(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Ready)
                | (Ready, Executing)
                | (Executing, Ready)
                | (Connecting, Closed)
                | (Ready, Closed)
                | (Executing, Closed)
        )
    }

    /// Move to `next`, failing when the transition is not allowed.
    pub fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.can_transition(next) {
            let expected = match next {
                SessionState::Ready => SessionState::Connecting,
                _ => SessionState::Ready,
            };
            return Err(Error::InvalidState {
                expected,
                actual: *self,
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Connecting => "connecting",
            SessionState::Ready => "ready",
            SessionState::Executing => "executing",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}
