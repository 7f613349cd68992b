// ABOUTME: Dependency directory handling around the symlink switch.
// ABOUTME: Either reuses the live release's dependencies or reinstalls them.

use super::error::DeployError;
use super::layout::RemoteLayout;
use super::runner::CommandRunner;
use super::step::Step;
use crate::shell::quote;
use crate::types::DirName;

/// Marker printed by the save command when a snapshot was moved aside.
const HELD_MARKER: &str = "held";

/// What happens to installed dependencies when the live release changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyPolicy {
    /// Leave dependencies alone.
    Disabled,
    /// Drop them from the new release and run `install` once it is live.
    Reinstall { dir: DirName, install: String },
    /// Carry the live release's directory over to the new one. `install`
    /// runs when there was nothing to carry.
    Reuse { dir: DirName, install: String },
}

impl DependencyPolicy {
    /// The dependency directory name, unless handling is disabled.
    pub fn dir(&self) -> Option<&DirName> {
        match self {
            DependencyPolicy::Disabled => None,
            DependencyPolicy::Reinstall { dir, .. } | DependencyPolicy::Reuse { dir, .. } => {
                Some(dir)
            }
        }
    }

    /// Prepare for the switch. Returns whether a snapshot is now held aside.
    ///
    /// `release` is the incoming release, when it is already known.
    pub(crate) async fn save(
        &self,
        runner: &CommandRunner<'_>,
        layout: &RemoteLayout,
        release: Option<&str>,
    ) -> Result<bool, DeployError> {
        let step = Step::SaveDependencySnapshot;
        match self {
            DependencyPolicy::Disabled => Ok(false),
            DependencyPolicy::Reinstall { dir, .. } => match release {
                Some(release) => {
                    let stale = crate::shell::join(&layout.release_dir(release), dir.as_str());
                    runner.run(step, &format!("rm -rf {}", quote(&stale))).await?;
                    Ok(false)
                }
                None => Ok(false),
            },
            DependencyPolicy::Reuse { dir, .. } => {
                let stdout = runner.run_for_output(step, &save_command(layout, dir)).await?;
                Ok(stdout.lines().any(|line| line.trim() == HELD_MARKER))
            }
        }
    }

    /// Bring dependencies into the now-live release.
    pub(crate) async fn restore(
        &self,
        runner: &CommandRunner<'_>,
        layout: &RemoteLayout,
        held: bool,
    ) -> Result<(), DeployError> {
        let step = Step::RestoreDependencySnapshot;
        match self {
            DependencyPolicy::Disabled => Ok(()),
            DependencyPolicy::Reuse { dir, .. } if held => {
                runner.run(step, &return_command(layout, dir)).await?;
                Ok(())
            }
            DependencyPolicy::Reuse { install, .. } | DependencyPolicy::Reinstall { install, .. } => {
                runner.run(step, &install_command(layout, install)).await?;
                Ok(())
            }
        }
    }
}

/// Move the live dependency directory to the holding location.
fn save_command(layout: &RemoteLayout, dir: &DirName) -> String {
    let live = layout.live_dependency_dir(dir);
    format!(
        "rm -rf {holding} && if [ -d {live} ]; then mv {live} {deploy}/ && echo {marker}; fi",
        holding = quote(&layout.holding_dir(dir)),
        live = quote(&live),
        deploy = quote(layout.deploy_path()),
        marker = HELD_MARKER,
    )
}

/// Move a held snapshot into whatever release is live now.
pub(crate) fn return_command(layout: &RemoteLayout, dir: &DirName) -> String {
    format!(
        "rm -rf {live} && mv {holding} {link}/",
        live = quote(&layout.live_dependency_dir(dir)),
        holding = quote(&layout.holding_dir(dir)),
        link = quote(&layout.link_path()),
    )
}

/// Move a snapshot that was already moved into `release` back into whatever
/// release is live now.
pub(crate) fn reclaim_command(layout: &RemoteLayout, dir: &DirName, release: &str) -> String {
    let moved = crate::shell::join(&layout.release_dir(release), dir.as_str());
    format!(
        "rm -rf {live} && mv {moved} {link}/",
        live = quote(&layout.live_dependency_dir(dir)),
        moved = quote(&moved),
        link = quote(&layout.link_path()),
    )
}

fn install_command(layout: &RemoteLayout, install: &str) -> String {
    format!("cd {} && {}", quote(&layout.link_path()), install)
}
