// ABOUTME: Artifact transfer over an SSH exec channel.
// ABOUTME: Streams a local file or directory as tar and unpacks it remotely with `tar -x`.

use super::client::SshHandler;
use super::error::{Error, Result};
use crate::shell::quote;
use russh::ChannelMsg;
use russh::client::Handle;
use snafu::{OptionExt, ResultExt, Snafu, ensure};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bytes handed to the channel per write.
const CHUNK_SIZE: usize = 32 * 1024;

/// Chunks buffered between the archiver and the channel.
const CHANNEL_DEPTH: usize = 8;

/// Errors raised while packing the local artifact.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransferError {
    #[snafu(display("local artifact {} does not exist", path.display()))]
    MissingArtifact { path: PathBuf },

    #[snafu(display("local artifact {} has no file name", path.display()))]
    Unnamed { path: PathBuf },

    #[snafu(display("failed to archive {}: {source}", path.display()))]
    Archive {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("archive task failed: {message}"))]
    Task { message: String },
}

/// Pack `local` into an in-memory tar archive.
pub fn build_archive(local: &Path) -> std::result::Result<Vec<u8>, TransferError> {
    write_archive(local, Vec::new())
}

/// Write `local` as a tar archive into `writer`.
///
/// A directory contributes its contents at the archive root; a single file is
/// stored under its own file name. Symlinks are stored as links.
fn write_archive<W: Write>(local: &Path, writer: W) -> std::result::Result<W, TransferError> {
    ensure!(local.exists(), MissingArtifactSnafu { path: local });

    let mut builder = tar::Builder::new(writer);
    builder.follow_symlinks(false);

    if local.is_dir() {
        builder
            .append_dir_all(".", local)
            .context(ArchiveSnafu { path: local })?;
    } else {
        let name = local.file_name().context(UnnamedSnafu { path: local })?;
        builder
            .append_path_with_name(local, name)
            .context(ArchiveSnafu { path: local })?;
    }

    builder.into_inner().context(ArchiveSnafu { path: local })
}

/// Blocking writer that hands fixed-size chunks to the async sender.
///
/// The channel is bounded, so archiving never runs more than a few chunks
/// ahead of the network.
struct ChunkWriter {
    tx: mpsc::Sender<Vec<u8>>,
    buf: Vec<u8>,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE));
        self.tx
            .blocking_send(chunk)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "upload channel closed"))
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = CHUNK_SIZE - self.buf.len();
        let taken = room.min(data.len());
        self.buf.extend_from_slice(&data[..taken]);
        if self.buf.len() == CHUNK_SIZE {
            self.send()?;
        }
        Ok(taken)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send()
    }
}

/// Archive `local` on the blocking pool, yielding chunks as they are written.
fn spawn_archiver(
    local: &Path,
) -> (
    mpsc::Receiver<Vec<u8>>,
    JoinHandle<std::result::Result<(), TransferError>>,
) {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    let local = local.to_path_buf();
    let task = tokio::task::spawn_blocking(move || {
        let mut writer = write_archive(&local, ChunkWriter::new(tx))?;
        writer.flush().context(ArchiveSnafu { path: local.as_path() })
    });
    (rx, task)
}

/// Stream `local` as a tar archive into `remote_dir` through a fresh exec
/// channel. The archive is never held in memory as a whole.
pub(crate) async fn send_archive(
    handle: &Handle<SshHandler>,
    local: &Path,
    remote_dir: &str,
) -> Result<()> {
    ensure!(local.exists(), MissingArtifactSnafu { path: local });
    let command = format!("tar -xf - -C {}", quote(remote_dir));

    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| Error::Transfer(format!("failed to open channel: {}", e)))?;

    channel
        .exec(true, command.as_str())
        .await
        .map_err(|e| Error::Transfer(format!("failed to start `{}`: {}", command, e)))?;

    let (mut chunks, archiver) = spawn_archiver(local);
    let mut sent = 0usize;
    while let Some(chunk) = chunks.recv().await {
        sent += chunk.len();
        channel
            .data(&chunk[..])
            .await
            .map_err(|e| Error::Transfer(format!("failed to send archive data: {}", e)))?;
    }
    archiver.await.map_err(|e| TransferError::Task {
        message: e.to_string(),
    })??;

    channel
        .eof()
        .await
        .map_err(|e| Error::Transfer(format!("failed to finish archive stream: {}", e)))?;

    let mut stderr = Vec::new();
    let mut exit_code = None;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::ExtendedData { data, ext }) if ext == 1 => {
                stderr.extend_from_slice(&data);
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                exit_code = Some(exit_status);
            }
            Some(ChannelMsg::Eof) if exit_code.is_some() => break,
            Some(ChannelMsg::Close) => break,
            Some(_) => {}
            None => break,
        }
    }

    match exit_code {
        Some(0) => {
            tracing::debug!("Unpacked {} bytes into {}", sent, remote_dir);
            Ok(())
        }
        Some(code) => Err(Error::Transfer(format!(
            "`{}` exited with {}: {}",
            command,
            code,
            String::from_utf8_lossy(&stderr).trim()
        ))),
        None => Err(Error::ChannelClosed),
    }
}
