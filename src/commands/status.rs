// ABOUTME: Status command implementation.
// ABOUTME: Lists releases on the target and marks the live one.

use slipway::config::DeploySettings;
use slipway::deploy::release_status;
use slipway::error::Result;
use slipway::events::SharedSink;
use slipway::output::Output;
use slipway::ssh::Connection;
use std::sync::Arc;

pub async fn status(settings: DeploySettings, output: Arc<Output>) -> Result<()> {
    let events: SharedSink = output.clone();
    let connection = Connection::open(settings.connection.clone(), events).await?;

    let result = release_status(
        &connection,
        &settings.layout,
        settings.dependencies.dir(),
    )
    .await;
    if let Err(e) = connection.close().await {
        output.warning(&format!("failed to close session: {}", e));
    }
    let status = result?;

    output.report(&status, || {
        let mut lines = vec![format!(
            "{} -> {}",
            settings.layout.link_path(),
            status.live.as_deref().unwrap_or("(none)")
        )];
        for release in &status.releases {
            let marker = if Some(release.as_str()) == status.live.as_deref() {
                "*"
            } else {
                " "
            };
            lines.push(format!("{} {}", marker, release));
        }
        lines.join("\n")
    });
    Ok(())
}
