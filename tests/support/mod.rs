// ABOUTME: Shared helpers for integration tests.
// ABOUTME: Remote host doubles: a scripted recorder and a local-shell host.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use slipway::deploy::RemoteHost;
use slipway::ssh::{self, CommandOutput, build_archive};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// One scripted reply: the first rule whose needle occurs in a command wins.
struct Rule {
    needle: String,
    output: CommandOutput,
}

/// Remote host that records commands and answers from a script.
///
/// Commands without a matching rule succeed with empty output.
#[derive(Default)]
pub struct ScriptedHost {
    rules: Vec<Rule>,
    upload_error: Option<String>,
    commands: Mutex<Vec<String>>,
    uploads: Mutex<Vec<(PathBuf, String)>>,
    closes: AtomicUsize,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `stdout` to commands containing `needle`.
    pub fn stdout_on(mut self, needle: &str, stdout: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output: CommandOutput {
                exit_code: 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        });
        self
    }

    /// Fail commands containing `needle` with `exit_code`.
    pub fn fail_on(mut self, needle: &str, exit_code: u32, stderr: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output: CommandOutput {
                exit_code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        });
        self
    }

    pub fn fail_upload(mut self, message: &str) -> Self {
        self.upload_error = Some(message.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn ran(&self, command: &str) -> bool {
        self.commands.lock().iter().any(|c| c == command)
    }
}

#[async_trait]
impl RemoteHost for ScriptedHost {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        self.commands.lock().push(command.to_string());
        Ok(self
            .rules
            .iter()
            .find(|rule| command.contains(&rule.needle))
            .map(|rule| rule.output.clone())
            .unwrap_or_default())
    }

    async fn upload(&self, local: &Path, remote_dir: &str) -> ssh::Result<()> {
        self.uploads
            .lock()
            .push((local.to_path_buf(), remote_dir.to_string()));
        match &self.upload_error {
            Some(message) => Err(ssh::Error::Transfer(message.clone())),
            None => Ok(()),
        }
    }

    async fn close(&self) -> ssh::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Remote host backed by the local shell inside a temporary directory.
///
/// Commands run through `sh -c`; uploads unpack the same tar archive the
/// SSH transfer streams.
pub struct LocalHost {
    root: TempDir,
    commands: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

impl LocalHost {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir(root.path().join("app")).expect("create deploy path");
        Self {
            root,
            commands: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn deploy_path(&self) -> PathBuf {
        self.root.path().join("app")
    }

    pub fn deploy_path_str(&self) -> String {
        self.deploy_path().to_string_lossy().into_owned()
    }

    /// A local directory to use as the artifact.
    pub fn artifact(&self, files: &[(&str, &str)]) -> PathBuf {
        let dir = self.root.path().join("build");
        std::fs::create_dir_all(&dir).expect("create artifact dir");
        for (name, content) in files {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create artifact subdir");
            }
            std::fs::write(path, content).expect("write artifact file");
        }
        dir
    }

    /// Create a release directory last modified `age` ago.
    pub fn seed_release(&self, name: &str, age: Duration) -> PathBuf {
        let dir = self.deploy_path().join(name);
        std::fs::create_dir_all(&dir).expect("create release dir");
        set_mtime(&dir, SystemTime::now() - age);
        dir
    }

    /// Point the live symlink at `release`, like the swap command does.
    pub fn link(&self, link: &str, release: &str) {
        let path = self.deploy_path().join(link);
        let _ = std::fs::remove_file(&path);
        std::os::unix::fs::symlink(release, path).expect("create symlink");
    }

    /// Target of the live symlink, if it exists.
    pub fn live(&self, link: &str) -> Option<String> {
        std::fs::read_link(self.deploy_path().join(link))
            .ok()
            .map(|p| p.to_string_lossy().into_owned())
    }

    /// Directory names directly under the deploy path, sorted.
    pub fn release_dirs(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.deploy_path())
            .expect("read deploy path")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Set a directory's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = std::fs::File::open(path).expect("open for mtime");
    file.set_modified(time).expect("set mtime");
}

#[async_trait]
impl RemoteHost for LocalHost {
    async fn exec(&self, command: &str) -> ssh::Result<CommandOutput> {
        self.commands.lock().push(command.to_string());
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.root.path())
            .output()
            .await?;
        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(255) as u32,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn upload(&self, local: &Path, remote_dir: &str) -> ssh::Result<()> {
        let archive = build_archive(local)?;
        tar::Archive::new(archive.as_slice()).unpack(remote_dir)?;
        Ok(())
    }

    async fn close(&self) -> ssh::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
