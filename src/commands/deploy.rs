// ABOUTME: Deploy command implementation.
// ABOUTME: Connects to the target and runs the release pipeline.

use super::emit_warnings;
use slipway::config::DeploySettings;
use slipway::deploy::ReleasePipeline;
use slipway::diagnostics::Diagnostics;
use slipway::error::{Error, Result};
use slipway::events::SharedSink;
use slipway::output::Output;
use slipway::ssh::Connection;
use slipway::types::ReleaseLabel;
use std::sync::Arc;

/// Deploy a new release to the configured target.
pub async fn deploy(settings: DeploySettings, label: Option<&str>, output: Arc<Output>) -> Result<()> {
    let label = label
        .map(ReleaseLabel::new)
        .transpose()
        .map_err(|e| Error::InvalidConfig(format!("invalid release label: {}", e)))?;
    let ctx = settings.release_context(label)?;

    output.progress(&format!(
        "Deploying {} to {}",
        ctx.label,
        settings.connection.target.address()
    ));

    let events: SharedSink = output.clone();
    let connection = Connection::open(settings.connection.clone(), events.clone()).await?;

    let mut diag = Diagnostics::default();
    let result = ReleasePipeline::new(&ctx, &connection, events)
        .run(&mut diag)
        .await;
    emit_warnings(&output, &diag);

    let report = result?;
    let mut message = format!("Deployed release {}", report.release);
    if let Some(pruned) = &report.pruned {
        message.push_str(&format!(" (pruned {})", pruned));
    }
    output.finish(&report, &message);
    Ok(())
}
