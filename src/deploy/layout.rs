// ABOUTME: Remote directory layout and the shell commands that manipulate it.
// ABOUTME: Every path is quoted before it reaches the remote shell.

use crate::shell::{join, quote};
use crate::types::{DirName, LinkName};

/// Where releases live on the target and what the live symlink is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    deploy_path: String,
    link: LinkName,
}

impl RemoteLayout {
    pub fn new(deploy_path: impl Into<String>, link: LinkName) -> Self {
        let deploy_path = deploy_path.into();
        let trimmed = deploy_path.trim_end_matches('/');
        let deploy_path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        };
        Self { deploy_path, link }
    }

    pub fn deploy_path(&self) -> &str {
        &self.deploy_path
    }

    pub fn link_name(&self) -> &LinkName {
        &self.link
    }

    pub fn release_dir(&self, release: &str) -> String {
        join(&self.deploy_path, release)
    }

    pub fn link_path(&self) -> String {
        join(&self.deploy_path, self.link.as_str())
    }

    /// Dependency directory inside the live release.
    pub fn live_dependency_dir(&self, dir: &DirName) -> String {
        join(&self.link_path(), dir.as_str())
    }

    /// Holding location for a dependency snapshot, beside the releases.
    pub fn holding_dir(&self, dir: &DirName) -> String {
        join(&self.deploy_path, dir.as_str())
    }

    /// Create the release directory. Fails when it already exists, so a
    /// reused label can never write into (or later delete) another release.
    pub fn create_release(&self, release: &str) -> String {
        let dir = self.release_dir(release);
        format!(
            "test ! -e {dir} || {{ echo {message} >&2; exit 1; }}; mkdir -p {dir}",
            dir = quote(&dir),
            message = quote(&format!("release {} already exists", dir)),
        )
    }

    pub fn delete_release(&self, release: &str) -> String {
        format!("rm -rf {}", quote(&format!("{}/", self.release_dir(release))))
    }

    /// Replace the live symlink in one command.
    pub fn swap_symlink(&self, release: &str) -> String {
        format!(
            "rm -rf {} && cd {} && ln -s {} {}",
            quote(&self.link_path()),
            quote(&self.deploy_path),
            quote(release),
            quote(self.link.as_str())
        )
    }

    pub fn remove_symlink(&self) -> String {
        format!("rm -f {}", quote(&self.link_path()))
    }

    /// Prints the live target, or nothing when there is no symlink.
    pub fn read_link(&self) -> String {
        format!("readlink {} || true", quote(&self.link_path()))
    }

    /// Newest first, one per line, directories suffixed with `/`.
    pub fn list_releases(&self) -> String {
        format!("ls -1tp {}", quote(&self.deploy_path))
    }
}
