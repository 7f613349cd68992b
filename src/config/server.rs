// ABOUTME: Server configuration for SSH connections.
// ABOUTME: Parses "host", "user@host", "host:port", "user@host:port" and resolves credentials.

use super::env_value::{EnvValue, resolve_optional};
use crate::error::{Error, Result};
use crate::ssh::{ConnectionConfig, Credentials, KeySource, SessionConfig};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    /// Key file path, or the key itself when it starts with `-----BEGIN`.
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub passphrase: Option<EnvValue>,
    #[serde(default)]
    pub password: Option<EnvValue>,
    #[serde(default, deserialize_with = "super::deserialize::deserialize_proxy_option")]
    pub proxy: Option<ProxyConfig>,
    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
}

/// Jump host the target is reached through. Shares the target's credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
}

fn default_port() -> u16 {
    22
}

fn default_trust_first_connection() -> bool {
    true
}

/// Split `[user@]host[:port]`.
fn parse_address(s: &str) -> std::result::Result<(Option<String>, String, u16), String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("server address cannot be empty".to_string());
    }

    let (user_part, rest) = if let Some(at_pos) = s.find('@') {
        (Some(&s[..at_pos]), &s[at_pos + 1..])
    } else {
        (None, s)
    };

    let (host, port) = if let Some(colon_pos) = rest.rfind(':') {
        let port_str = &rest[colon_pos + 1..];
        let port = port_str
            .parse::<u16>()
            .map_err(|_| format!("invalid port: {}", port_str))?;
        (&rest[..colon_pos], port)
    } else {
        (rest, 22)
    };

    if host.is_empty() {
        return Err("hostname cannot be empty".to_string());
    }

    Ok((user_part.map(|s| s.to_string()), host.to_string(), port))
}

impl ProxyConfig {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let (user, host, port) = parse_address(s)?;
        Ok(ProxyConfig { host, port, user })
    }
}

impl ServerConfig {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let (user, host, port) = parse_address(s)?;
        Ok(ServerConfig {
            host,
            port,
            user,
            private_key: None,
            passphrase: None,
            password: None,
            proxy: None,
            trust_first_connection: true,
            known_hosts: None,
        })
    }

    /// Login name: configured user, then `$USER`, then `root`.
    pub fn user_name(&self) -> String {
        self.user
            .clone()
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }

    /// Resolve credentials. A private key wins over a password; having
    /// neither is a configuration error.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(key) = self.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let passphrase = resolve_optional(self.passphrase.as_ref())?;
            let key = if key.trim_start().starts_with("-----BEGIN") {
                KeySource::Inline(key.to_string())
            } else {
                KeySource::Path(expand_home(key))
            };
            return Ok(Credentials::PrivateKey { key, passphrase });
        }

        if let Some(password) = resolve_optional(self.password.as_ref())? {
            return Ok(Credentials::Password(password));
        }

        Err(Error::MissingCredentials(self.host.clone()))
    }

    /// Build the connection plan for this server.
    pub fn connection_config(
        &self,
        command_timeout: Duration,
        transfer_timeout: Duration,
    ) -> Result<ConnectionConfig> {
        let credentials = self.credentials()?;
        let user = self.user_name();

        let session = |host: &str, port: u16, user: String| {
            let mut config = SessionConfig::new(host, user, credentials.clone())
                .port(port)
                .trust_on_first_use(self.trust_first_connection)
                .command_timeout(command_timeout)
                .transfer_timeout(transfer_timeout);
            if let Some(path) = &self.known_hosts {
                config = config.known_hosts_path(expand_home(&path.to_string_lossy()));
            }
            config
        };

        let target = session(&self.host, self.port, user.clone());
        Ok(match &self.proxy {
            Some(proxy) => {
                let proxy_user = proxy.user.clone().unwrap_or(user);
                ConnectionConfig::via(target, session(&proxy.host, proxy.port, proxy_user))
            }
            None => ConnectionConfig::direct(target),
        })
    }
}

/// Expand a leading `~/` to `$HOME`.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}
