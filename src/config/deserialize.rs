// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Accepts servers and proxies as "user@host:port" strings or mappings.

use serde::Deserialize;

use super::{ProxyConfig, ServerConfig};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerEntry {
    Simple(String),
    Detailed(ServerConfig),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProxyEntry {
    Simple(String),
    Detailed(ProxyConfig),
}

pub fn deserialize_server_option<'de, D>(deserializer: D) -> Result<Option<ServerConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<ServerEntry>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ServerEntry::Simple(s)) => ServerConfig::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(ServerEntry::Detailed(c)) => Ok(Some(c)),
    }
}

pub fn deserialize_proxy_option<'de, D>(deserializer: D) -> Result<Option<ProxyConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<ProxyEntry>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ProxyEntry::Simple(s)) => ProxyConfig::parse(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(ProxyEntry::Detailed(p)) => Ok(Some(p)),
    }
}
