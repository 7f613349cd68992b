// ABOUTME: The remote host seam the pipelines run against.
// ABOUTME: Implemented by SSH connections and by test doubles.

use crate::ssh::{self, CommandOutput, Connection, Session};
use async_trait::async_trait;
use std::path::Path;

/// Operations a pipeline needs from the deploy target.
#[async_trait]
pub trait RemoteHost: Send + Sync {
    /// Run one shell command to completion.
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput>;

    /// Copy a local file or directory into an existing remote directory.
    async fn upload(&self, local: &Path, remote_dir: &str) -> ssh::Result<()>;

    /// Close the connection. Must be safe to call more than once.
    async fn close(&self) -> ssh::Result<()>;
}

#[async_trait]
impl RemoteHost for Connection {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        Connection::exec(self, command).await
    }

    async fn upload(&self, local: &Path, remote_dir: &str) -> ssh::Result<()> {
        Connection::upload(self, local, remote_dir).await
    }

    async fn close(&self) -> ssh::Result<()> {
        Connection::close(self).await
    }
}

#[async_trait]
impl RemoteHost for Session {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        Session::exec(self, command).await
    }

    async fn upload(&self, local: &Path, remote_dir: &str) -> ssh::Result<()> {
        Session::upload(self, local, remote_dir).await
    }

    async fn close(&self) -> ssh::Result<()> {
        Session::close(self).await
    }
}
