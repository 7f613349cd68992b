// ABOUTME: Release orchestration: release and rollback pipelines over a remote host.
// ABOUTME: Exports step descriptors, contexts, the command runner, and reports.

mod cleanup;
mod context;
mod dependencies;
mod error;
mod host;
mod layout;
mod listing;
mod release;
mod rollback;
mod runner;
mod status;
mod step;

pub use context::{DeployReport, PipelineContext, RollbackContext, RollbackReport};
pub use dependencies::DependencyPolicy;
pub use error::{DeployError, DeployErrorKind, StepFailure};
pub use host::RemoteHost;
pub use layout::RemoteLayout;
pub use listing::{ReleaseListing, live_release};
pub use release::ReleasePipeline;
pub use rollback::RollbackPipeline;
pub use runner::CommandRunner;
pub use status::{ReleaseStatus, release_status};
pub use step::Step;
