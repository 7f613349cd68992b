// ABOUTME: Inputs and run state for the pipelines.
// ABOUTME: Contexts are read-only; Progress records what a run has done so far.

use super::dependencies::DependencyPolicy;
use super::layout::RemoteLayout;
use super::step::Step;
use crate::hooks::HookList;
use crate::types::ReleaseLabel;
use serde::Serialize;
use std::path::PathBuf;

/// Everything a release run needs to know up front.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub layout: RemoteLayout,
    pub label: ReleaseLabel,
    pub local_path: PathBuf,
    /// Releases to retain besides the live one. `None` disables pruning.
    pub keep: Option<usize>,
    pub before_deploy: HookList,
    pub after_deploy: HookList,
    pub dependencies: DependencyPolicy,
}

/// Everything a rollback run needs to know up front.
#[derive(Debug, Clone)]
pub struct RollbackContext {
    pub layout: RemoteLayout,
    pub dependencies: DependencyPolicy,
    pub delete_rolled_back: bool,
}

/// Mutable record of a run in flight.
#[derive(Debug, Default)]
pub(crate) struct Progress {
    pub steps: Vec<Step>,
    /// This run created the release directory, so cleanup may remove it.
    pub release_created: bool,
    /// Live release before the switch, read right before it.
    pub previous_live: Option<String>,
    /// Set as soon as the swap command is issued.
    pub symlink_touched: bool,
    pub snapshot_held: bool,
    /// The held snapshot now lives inside the new release.
    pub snapshot_moved_in: bool,
    pub pruned: Option<String>,
    pub rollback_target: Option<String>,
    pub deleted: Option<String>,
}

/// Result of a successful release.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub release: ReleaseLabel,
    pub previous: Option<String>,
    pub pruned: Option<String>,
    pub steps: Vec<Step>,
}

/// Result of a successful rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    /// Release that was live before the rollback.
    pub from: Option<String>,
    /// Release that is live now.
    pub to: String,
    pub deleted: Option<String>,
    pub steps: Vec<Step>,
}
