// ABOUTME: A connection to the deploy target, direct or through a proxy host.
// ABOUTME: Orders proxy and tunnelled session setup and tears them down inner-first.

use super::client::{CommandOutput, Session, SessionConfig};
use super::error::Result;
use super::tunnel;
use crate::events::SharedSink;
use std::path::Path;

/// Where to connect.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// The deploy target.
    pub target: SessionConfig,
    /// Optional jump host the target is reached through.
    pub proxy: Option<SessionConfig>,
}

impl ConnectionConfig {
    pub fn direct(target: SessionConfig) -> Self {
        Self {
            target,
            proxy: None,
        }
    }

    pub fn via(target: SessionConfig, proxy: SessionConfig) -> Self {
        Self {
            target,
            proxy: Some(proxy),
        }
    }
}

/// An open connection to the deploy target.
///
/// With a proxy, two sessions are alive: the proxy session and the target
/// session multiplexed over a forwarded stream inside it.
#[derive(Debug)]
pub struct Connection {
    target: Session,
    proxy: Option<Session>,
}

impl Connection {
    /// Connect to the target, going through the proxy first when one is set.
    ///
    /// The target session only starts connecting after the proxy session is
    /// ready and the forward was granted. On any failure the proxy session is
    /// closed again.
    pub async fn open(config: ConnectionConfig, events: SharedSink) -> Result<Self> {
        let Some(proxy_config) = config.proxy else {
            let target = Session::connect(config.target, events).await?;
            return Ok(Self {
                target,
                proxy: None,
            });
        };

        let proxy = Session::connect(proxy_config, events.clone()).await?;

        let stream = match tunnel::open(&proxy, &config.target).await {
            Ok(stream) => stream,
            Err(e) => {
                if let Err(close_err) = proxy.close().await {
                    tracing::warn!("Failed to close proxy session: {}", close_err);
                }
                return Err(e);
            }
        };

        match Session::connect_stream(config.target, stream, events).await {
            Ok(target) => Ok(Self {
                target,
                proxy: Some(proxy),
            }),
            Err(e) => {
                if let Err(close_err) = proxy.close().await {
                    tracing::warn!("Failed to close proxy session: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// The session commands run on.
    pub fn session(&self) -> &Session {
        &self.target
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.target.exec(command).await
    }

    pub async fn upload(&self, local: &Path, remote_dir: &str) -> Result<()> {
        self.target.upload(local, remote_dir).await
    }

    /// Close the target session, then the proxy session.
    ///
    /// Both are attempted; the first error is returned.
    pub async fn close(&self) -> Result<()> {
        let target_result = self.target.close().await;
        let proxy_result = match &self.proxy {
            Some(proxy) => proxy.close().await,
            None => Ok(()),
        };
        target_result.and(proxy_result)
    }
}
