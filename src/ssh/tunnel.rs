// ABOUTME: Proxy tunnelling via SSH direct-tcpip channels.
// ABOUTME: Opens a raw byte stream from the proxy host to the target's SSH port.

use super::client::{Session, SessionConfig};
use super::error::{Error, Result};
use russh::ChannelStream;
use russh::client::Msg;

/// Address reported to the proxy as the originator of the forward.
const ORIGINATOR_ADDRESS: &str = "127.0.0.1";

/// Ask `proxy` for a TCP stream to `target`'s SSH port.
///
/// The returned stream carries the second SSH handshake; it stays valid only as
/// long as the proxy session is open.
pub(crate) async fn open(proxy: &Session, target: &SessionConfig) -> Result<ChannelStream<Msg>> {
    tracing::debug!(
        "Opening direct-tcpip forward from {} to {}",
        proxy.host(),
        target.address()
    );

    let channel = proxy
        .handle()
        .channel_open_direct_tcpip(
            target.host.clone(),
            u32::from(target.port),
            ORIGINATOR_ADDRESS,
            0,
        )
        .await
        .map_err(|e| Error::ProxyForwardFailed {
            proxy: proxy.host().to_string(),
            target: target.address(),
            reason: e.to_string(),
        })?;

    Ok(channel.into_stream())
}
