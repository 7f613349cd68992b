// ABOUTME: Rollback command implementation.
// ABOUTME: Connects to the target and runs the rollback pipeline.

use super::emit_warnings;
use slipway::config::DeploySettings;
use slipway::deploy::RollbackPipeline;
use slipway::diagnostics::Diagnostics;
use slipway::error::Result;
use slipway::events::SharedSink;
use slipway::output::Output;
use slipway::ssh::Connection;
use std::sync::Arc;

/// Roll the target back to its previous release.
pub async fn rollback(settings: DeploySettings, output: Arc<Output>) -> Result<()> {
    let ctx = settings.rollback_context();

    output.progress(&format!(
        "Rolling back {} on {}",
        ctx.layout.link_path(),
        settings.connection.target.address()
    ));

    let events: SharedSink = output.clone();
    let connection = Connection::open(settings.connection.clone(), events.clone()).await?;

    let mut diag = Diagnostics::default();
    let result = RollbackPipeline::new(&ctx, &connection, events)
        .run(&mut diag)
        .await;
    emit_warnings(&output, &diag);

    let report = result?;
    let message = match &report.from {
        Some(from) => format!("Rolled back from {} to {}", from, report.to),
        None => format!("Rolled back to {}", report.to),
    };
    output.finish(&report, &message);
    Ok(())
}
