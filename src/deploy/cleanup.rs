// ABOUTME: Best-effort recovery after a failed step, and session teardown.
// ABOUTME: Recovery failures become warnings and never replace the original error.

use super::context::Progress;
use super::dependencies::{DependencyPolicy, reclaim_command, return_command};
use super::layout::RemoteLayout;
use super::runner::CommandRunner;
use super::step::Step;
use crate::diagnostics::{Diagnostics, Warning};
use crate::events::Event;

/// Undo a release that failed before it was fully live.
///
/// Restores the previous symlink target and hands the dependency snapshot
/// back to it, wherever it currently sits. Then removes the in-flight release
/// directory, but only one this run created. When the symlink or the snapshot
/// cannot be put back, the release is left in place.
pub(crate) async fn discard_release(
    runner: &CommandRunner<'_>,
    failed: Step,
    layout: &RemoteLayout,
    dependencies: &DependencyPolicy,
    release: &str,
    progress: &Progress,
    diagnostics: &mut Diagnostics,
) {
    if progress.symlink_touched {
        let restored = match progress.previous_live.as_deref() {
            Some(previous) => {
                let command = layout.swap_symlink(previous);
                attempt(runner, failed, "restore previous symlink", &command, diagnostics).await
            }
            None => {
                let command = layout.remove_symlink();
                attempt(runner, failed, "remove new symlink", &command, diagnostics).await
            }
        };
        if !restored {
            keep_release(release, "the live symlink could not be restored", diagnostics);
            return;
        }
    }

    if progress.snapshot_moved_in
        && progress.previous_live.is_some()
        && let Some(dir) = dependencies.dir()
    {
        let command = reclaim_command(layout, dir, release);
        if !attempt(runner, failed, "return dependency snapshot", &command, diagnostics).await {
            keep_release(release, "it still holds the dependency snapshot", diagnostics);
            return;
        }
    }

    return_snapshot(runner, failed, layout, dependencies, progress, diagnostics).await;

    if progress.release_created {
        let command = layout.delete_release(release);
        attempt(runner, failed, "delete release", &command, diagnostics).await;
    }
}

fn keep_release(release: &str, reason: &str, diagnostics: &mut Diagnostics) {
    diagnostics.warn(Warning::cleanup_failed(format!(
        "release {} was left in place: {}",
        release, reason
    )));
}

/// Hand a dependency snapshot that is still held back to the live release.
pub(crate) async fn return_snapshot(
    runner: &CommandRunner<'_>,
    failed: Step,
    layout: &RemoteLayout,
    dependencies: &DependencyPolicy,
    progress: &Progress,
    diagnostics: &mut Diagnostics,
) {
    if !progress.snapshot_held {
        return;
    }
    if let Some(dir) = dependencies.dir() {
        let command = return_command(layout, dir);
        attempt(runner, failed, "return dependency snapshot", &command, diagnostics).await;
    }
}

/// Close the session. Runs exactly once at the end of every pipeline.
pub(crate) async fn close_session(
    runner: &CommandRunner<'_>,
    progress: &mut Progress,
    diagnostics: &mut Diagnostics,
) {
    let events = runner.events();
    events.emit(Event::StepStarted(Step::CloseSession));
    if let Err(e) = runner.close().await {
        diagnostics.warn(Warning::ssh_disconnect(format!(
            "failed to close session: {}",
            e
        )));
    }
    progress.steps.push(Step::CloseSession);
    events.emit(Event::StepFinished(Step::CloseSession));
}

async fn attempt(
    runner: &CommandRunner<'_>,
    failed: Step,
    action: &str,
    command: &str,
    diagnostics: &mut Diagnostics,
) -> bool {
    runner.events().emit(Event::Cleanup {
        action: action.to_string(),
    });
    tracing::info!("Cleanup after {}: {}", failed, action);

    match runner.run(failed, command).await {
        Ok(_) => true,
        Err(e) => {
            diagnostics.warn(Warning::cleanup_failed(format!("{} failed: {}", action, e)));
            false
        }
    }
}
