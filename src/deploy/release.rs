// ABOUTME: The release pipeline: upload a new release and make it live.
// ABOUTME: One driver loop walks Step::DEPLOY and dispatches to cleanup on failure.

use super::cleanup;
use super::context::{DeployReport, PipelineContext, Progress};
use super::error::DeployError;
use super::host::RemoteHost;
use super::listing::{ReleaseListing, live_release};
use super::runner::CommandRunner;
use super::step::Step;
use crate::diagnostics::Diagnostics;
use crate::events::{Event, SharedSink};
use crate::hooks::{HookPoint, run_hooks};

/// Drives one release against one host.
pub struct ReleasePipeline<'a> {
    ctx: &'a PipelineContext,
    runner: CommandRunner<'a>,
}

impl<'a> ReleasePipeline<'a> {
    pub fn new(ctx: &'a PipelineContext, host: &'a dyn RemoteHost, events: SharedSink) -> Self {
        Self {
            ctx,
            runner: CommandRunner::new(host, events),
        }
    }

    /// Run every step in order, stopping at the first failure.
    ///
    /// A failure before the release is fully live discards it. The session
    /// is closed exactly once either way.
    pub async fn run(self, diagnostics: &mut Diagnostics) -> Result<DeployReport, DeployError> {
        let mut progress = Progress::default();
        let mut outcome = Ok(());

        tracing::info!(
            "Deploying {} to {}",
            self.ctx.label,
            self.ctx.layout.release_dir(self.ctx.label.as_str())
        );

        for step in Step::DEPLOY {
            self.runner.events().emit(Event::StepStarted(step));
            tracing::info!("{}", step.description());

            if let Err(e) = self.execute(step, &mut progress).await {
                tracing::error!(%step, "{}", e);
                if step.discards_release_on_failure() {
                    cleanup::discard_release(
                        &self.runner,
                        step,
                        &self.ctx.layout,
                        &self.ctx.dependencies,
                        self.ctx.label.as_str(),
                        &progress,
                        diagnostics,
                    )
                    .await;
                }
                outcome = Err(e);
                break;
            }

            progress.steps.push(step);
            self.runner.events().emit(Event::StepFinished(step));
        }

        cleanup::close_session(&self.runner, &mut progress, diagnostics).await;

        outcome.map(|()| DeployReport {
            release: self.ctx.label.clone(),
            previous: progress.previous_live,
            pruned: progress.pruned,
            steps: progress.steps,
        })
    }

    async fn execute(&self, step: Step, progress: &mut Progress) -> Result<(), DeployError> {
        let layout = &self.ctx.layout;
        let label = self.ctx.label.as_str();

        match step {
            Step::BeforeHooks => {
                run_hooks(&self.runner, HookPoint::BeforeDeploy, &self.ctx.before_deploy).await
            }
            Step::CreateReleaseDir => {
                self.runner.run(step, &layout.create_release(label)).await?;
                progress.release_created = true;
                Ok(())
            }
            Step::UploadArtifact => {
                self.runner
                    .upload(step, &self.ctx.local_path, &layout.release_dir(label))
                    .await
            }
            Step::SaveDependencySnapshot => {
                progress.snapshot_held = self
                    .ctx
                    .dependencies
                    .save(&self.runner, layout, Some(label))
                    .await?;
                Ok(())
            }
            Step::UpdateSymlink => {
                let current = self.runner.run_for_output(step, &layout.read_link()).await?;
                progress.previous_live = live_release(&current);
                progress.symlink_touched = true;
                self.runner.run(step, &layout.swap_symlink(label)).await?;
                Ok(())
            }
            Step::RestoreDependencySnapshot => {
                self.ctx
                    .dependencies
                    .restore(&self.runner, layout, progress.snapshot_held)
                    .await?;
                progress.snapshot_moved_in = progress.snapshot_held;
                progress.snapshot_held = false;
                Ok(())
            }
            Step::AfterHooks => {
                run_hooks(&self.runner, HookPoint::AfterDeploy, &self.ctx.after_deploy).await
            }
            Step::PruneOld => self.prune(progress).await,
            other => {
                tracing::debug!("{} is not a release step", other);
                Ok(())
            }
        }
    }

    async fn prune(&self, progress: &mut Progress) -> Result<(), DeployError> {
        let Some(keep) = self.ctx.keep else {
            return Ok(());
        };
        let layout = &self.ctx.layout;

        let output = self
            .runner
            .run_for_output(Step::PruneOld, &layout.list_releases())
            .await?;
        let listing = ReleaseListing::parse(&output, self.ctx.dependencies.dir());

        let mut protected = vec![self.ctx.label.as_str()];
        if let Some(previous) = progress.previous_live.as_deref() {
            protected.push(previous);
        }

        if let Some(oldest) = listing.prune_candidate(keep, &protected) {
            tracing::info!("Deleting oldest release {}", oldest);
            self.runner
                .run(Step::PruneOld, &layout.delete_release(oldest))
                .await?;
            progress.pruned = Some(oldest.to_string());
        }
        Ok(())
    }
}
