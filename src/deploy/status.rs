// ABOUTME: Read-only inspection of the releases on a target.
// ABOUTME: Reports the live release and every release directory, newest first.

use super::host::RemoteHost;
use super::layout::RemoteLayout;
use super::listing::{ReleaseListing, live_release};
use crate::ssh::{self, CommandOutput};
use crate::types::DirName;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseStatus {
    pub live: Option<String>,
    pub releases: Vec<String>,
}

/// Read the live symlink and the release listing.
pub async fn release_status(
    host: &dyn RemoteHost,
    layout: &RemoteLayout,
    holding: Option<&DirName>,
) -> ssh::Result<ReleaseStatus> {
    let link = checked(host, &layout.read_link()).await?;
    let listing = checked(host, &layout.list_releases()).await?;

    Ok(ReleaseStatus {
        live: live_release(&link.stdout),
        releases: ReleaseListing::parse(&listing.stdout, holding)
            .releases()
            .to_vec(),
    })
}

async fn checked(host: &dyn RemoteHost, command: &str) -> ssh::Result<CommandOutput> {
    let output = host.exec(command).await?;
    if output.success() {
        Ok(output)
    } else {
        Err(ssh::Error::CommandFailed(format!(
            "`{}` exited with {}: {}",
            command,
            output.exit_code,
            output.stderr.trim()
        )))
    }
}
