// ABOUTME: Pipeline step descriptors for releases and rollbacks.
// ABOUTME: Fixed step orders are consumed by one driver loop per pipeline.

use serde::Serialize;
use std::fmt;

/// One unit of remote work in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    BeforeHooks,
    CreateReleaseDir,
    UploadArtifact,
    SaveDependencySnapshot,
    UpdateSymlink,
    RestoreDependencySnapshot,
    AfterHooks,
    PruneOld,
    FindPreviousRelease,
    UpdateSymlinkToPrevious,
    DeleteRolledBackRelease,
    /// Terminal step of every run, on success and failure alike.
    CloseSession,
}

impl Step {
    /// Release pipeline order. `CloseSession` follows implicitly.
    pub const DEPLOY: [Step; 8] = [
        Step::BeforeHooks,
        Step::CreateReleaseDir,
        Step::UploadArtifact,
        Step::SaveDependencySnapshot,
        Step::UpdateSymlink,
        Step::RestoreDependencySnapshot,
        Step::AfterHooks,
        Step::PruneOld,
    ];

    /// Rollback pipeline order, without the optional deletion step.
    pub const ROLLBACK: [Step; 4] = [
        Step::SaveDependencySnapshot,
        Step::FindPreviousRelease,
        Step::UpdateSymlinkToPrevious,
        Step::RestoreDependencySnapshot,
    ];

    /// Rollback steps, with `DeleteRolledBackRelease` appended when enabled.
    pub fn rollback(delete_rolled_back: bool) -> Vec<Step> {
        let mut steps = Self::ROLLBACK.to_vec();
        if delete_rolled_back {
            steps.push(Step::DeleteRolledBackRelease);
        }
        steps
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::BeforeHooks => "before_hooks",
            Step::CreateReleaseDir => "create_release_dir",
            Step::UploadArtifact => "upload_artifact",
            Step::SaveDependencySnapshot => "save_dependency_snapshot",
            Step::UpdateSymlink => "update_symlink",
            Step::RestoreDependencySnapshot => "restore_dependency_snapshot",
            Step::AfterHooks => "after_hooks",
            Step::PruneOld => "prune_old",
            Step::FindPreviousRelease => "find_previous_release",
            Step::UpdateSymlinkToPrevious => "update_symlink_to_previous",
            Step::DeleteRolledBackRelease => "delete_rolled_back_release",
            Step::CloseSession => "close_session",
        }
    }

    /// Human readable progress line.
    pub fn description(self) -> &'static str {
        match self {
            Step::BeforeHooks => "Running before-deploy hooks",
            Step::CreateReleaseDir => "Creating release directory",
            Step::UploadArtifact => "Uploading artifact",
            Step::SaveDependencySnapshot => "Saving dependencies",
            Step::UpdateSymlink => "Switching live symlink",
            Step::RestoreDependencySnapshot => "Restoring dependencies",
            Step::AfterHooks => "Running after-deploy hooks",
            Step::PruneOld => "Pruning old releases",
            Step::FindPreviousRelease => "Finding previous release",
            Step::UpdateSymlinkToPrevious => "Switching live symlink to previous release",
            Step::DeleteRolledBackRelease => "Deleting rolled-back release",
            Step::CloseSession => "Closing session",
        }
    }

    /// Whether a failure in this release step discards the in-flight release.
    ///
    /// `PruneOld` runs after the new release is live, so it never does.
    pub fn discards_release_on_failure(self) -> bool {
        matches!(
            self,
            Step::BeforeHooks
                | Step::CreateReleaseDir
                | Step::UploadArtifact
                | Step::SaveDependencySnapshot
                | Step::UpdateSymlink
                | Step::RestoreDependencySnapshot
                | Step::AfterHooks
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
