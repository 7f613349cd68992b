// ABOUTME: The rollback pipeline: point the live symlink at the previous release.
// ABOUTME: Never deletes a release on failure; returns held dependencies instead.

use super::cleanup;
use super::context::{Progress, RollbackContext, RollbackReport};
use super::error::DeployError;
use super::host::RemoteHost;
use super::listing::{ReleaseListing, live_release};
use super::runner::CommandRunner;
use super::step::Step;
use crate::diagnostics::Diagnostics;
use crate::events::{Event, SharedSink};

/// Drives one rollback against one host.
pub struct RollbackPipeline<'a> {
    ctx: &'a RollbackContext,
    runner: CommandRunner<'a>,
}

impl<'a> RollbackPipeline<'a> {
    pub fn new(ctx: &'a RollbackContext, host: &'a dyn RemoteHost, events: SharedSink) -> Self {
        Self {
            ctx,
            runner: CommandRunner::new(host, events),
        }
    }

    pub async fn run(self, diagnostics: &mut Diagnostics) -> Result<RollbackReport, DeployError> {
        let mut progress = Progress::default();
        let mut outcome = Ok(());

        for step in Step::rollback(self.ctx.delete_rolled_back) {
            self.runner.events().emit(Event::StepStarted(step));
            tracing::info!("{}", step.description());

            if let Err(e) = self.execute(step, &mut progress).await {
                tracing::error!(%step, "{}", e);
                cleanup::return_snapshot(
                    &self.runner,
                    step,
                    &self.ctx.layout,
                    &self.ctx.dependencies,
                    &progress,
                    diagnostics,
                )
                .await;
                outcome = Err(e);
                break;
            }

            progress.steps.push(step);
            self.runner.events().emit(Event::StepFinished(step));
        }

        cleanup::close_session(&self.runner, &mut progress, diagnostics).await;

        outcome?;
        let to = progress
            .rollback_target
            .ok_or(DeployError::NoPreviousRelease)?;
        Ok(RollbackReport {
            from: progress.previous_live,
            to,
            deleted: progress.deleted,
            steps: progress.steps,
        })
    }

    async fn execute(&self, step: Step, progress: &mut Progress) -> Result<(), DeployError> {
        let layout = &self.ctx.layout;

        match step {
            Step::SaveDependencySnapshot => {
                progress.snapshot_held = self.ctx.dependencies.save(&self.runner, layout, None).await?;
                Ok(())
            }
            Step::FindPreviousRelease => {
                let target = self.find_previous(progress).await?;
                tracing::info!("Rolling back to {}", target);
                progress.rollback_target = Some(target);
                Ok(())
            }
            Step::UpdateSymlinkToPrevious => {
                let target = progress
                    .rollback_target
                    .as_deref()
                    .ok_or(DeployError::NoPreviousRelease)?;
                self.runner.run(step, &layout.swap_symlink(target)).await?;
                Ok(())
            }
            Step::RestoreDependencySnapshot => {
                self.ctx
                    .dependencies
                    .restore(&self.runner, layout, progress.snapshot_held)
                    .await?;
                progress.snapshot_held = false;
                Ok(())
            }
            Step::DeleteRolledBackRelease => {
                if let Some(abandoned) = progress.previous_live.clone() {
                    tracing::info!("Deleting rolled-back release {}", abandoned);
                    self.runner.run(step, &layout.delete_release(&abandoned)).await?;
                    progress.deleted = Some(abandoned);
                }
                Ok(())
            }
            other => {
                tracing::debug!("{} is not a rollback step", other);
                Ok(())
            }
        }
    }

    /// The newest release that is not the live one.
    async fn find_previous(&self, progress: &mut Progress) -> Result<String, DeployError> {
        let layout = &self.ctx.layout;
        let step = Step::FindPreviousRelease;

        let current = self.runner.run_for_output(step, &layout.read_link()).await?;
        progress.previous_live = live_release(&current);

        let output = self.runner.run_for_output(step, &layout.list_releases()).await?;
        let listing = ReleaseListing::parse(&output, self.ctx.dependencies.dir());

        listing
            .previous_of(progress.previous_live.as_deref())
            .map(str::to_string)
            .ok_or(DeployError::NoPreviousRelease)
    }
}
