// ABOUTME: SSH client module for remote server connections.
// ABOUTME: Key or password auth, proxy tunnelling, command execution, and artifact upload.

mod client;
mod connection;
mod error;
mod state;
mod transfer;
mod tunnel;

pub use client::{CommandOutput, Credentials, KeySource, Session, SessionConfig};
pub use connection::{Connection, ConnectionConfig};
pub use error::{Error, Result};
pub use state::SessionState;
pub use transfer::{TransferError, build_archive};
