// ABOUTME: Configuration types and parsing for slipway.yml.
// ABOUTME: Handles YAML parsing, env var indirection, and environment merging.

mod deserialize;
mod env_value;
mod init;
mod server;
mod settings;

pub use env_value::EnvValue;
pub use init::init_config;
pub use server::{ProxyConfig, ServerConfig};
pub use settings::DeploySettings;

use crate::deploy::DependencyPolicy;
use crate::error::{Error, Result};
use crate::hooks::HookList;
use crate::types::{DirName, LinkName, ReleaseLabel};
use deserialize::deserialize_server_option;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "slipway.yml";
pub const CONFIG_FILENAME_ALT: &str = "slipway.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".slipway/config.yml";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub options: Options,

    /// Named overrides, selected on the command line.
    #[serde(default)]
    pub environments: HashMap<String, Options>,
}

/// Deployment options. Every field is optional so environments can
/// override any subset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Options {
    #[serde(default, deserialize_with = "deserialize_server_option")]
    pub server: Option<ServerConfig>,

    #[serde(default)]
    pub deploy_path: Option<String>,

    #[serde(default)]
    pub local_path: Option<PathBuf>,

    #[serde(default)]
    pub current_symlink: Option<LinkName>,

    #[serde(default)]
    pub version_label: Option<ReleaseLabel>,

    #[serde(default)]
    pub keep: Option<usize>,

    #[serde(default)]
    pub before_deploy: Option<HookList>,

    #[serde(default)]
    pub after_deploy: Option<HookList>,

    #[serde(default)]
    pub dependencies: Option<DependencyConfig>,

    #[serde(default)]
    pub delete_rolled_back: Option<bool>,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub transfer_timeout: Option<Duration>,
}

/// How dependencies survive a release switch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_dependency_dir")]
    pub dir: DirName,

    /// Reinstall instead of carrying the live release's directory over.
    #[serde(default)]
    pub update: bool,

    #[serde(default = "default_install")]
    pub install: String,
}

fn default_enabled() -> bool {
    true
}

fn default_dependency_dir() -> DirName {
    DirName::node_modules()
}

fn default_install() -> String {
    "npm install --production".to_string()
}

impl Default for DependencyConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dir: default_dependency_dir(),
            update: false,
            install: default_install(),
        }
    }
}

impl DependencyConfig {
    pub fn policy(&self) -> DependencyPolicy {
        match (self.enabled, self.update) {
            (false, _) => DependencyPolicy::Disabled,
            (true, true) => DependencyPolicy::Reinstall {
                dir: self.dir.clone(),
                install: self.install.clone(),
            },
            (true, false) => DependencyPolicy::Reuse {
                dir: self.dir.clone(),
                install: self.install.clone(),
            },
        }
    }
}

pub(crate) fn default_command_timeout() -> Duration {
    Duration::from_secs(300)
}

pub(crate) fn default_transfer_timeout() -> Duration {
    Duration::from_secs(1800)
}

impl Options {
    /// Fields set in `over` replace the ones set here.
    pub fn overlay(&self, over: &Options) -> Options {
        fn pick<T: Clone>(over: &Option<T>, base: &Option<T>) -> Option<T> {
            over.clone().or_else(|| base.clone())
        }

        Options {
            server: pick(&over.server, &self.server),
            deploy_path: pick(&over.deploy_path, &self.deploy_path),
            local_path: pick(&over.local_path, &self.local_path),
            current_symlink: pick(&over.current_symlink, &self.current_symlink),
            version_label: pick(&over.version_label, &self.version_label),
            keep: pick(&over.keep, &self.keep),
            before_deploy: pick(&over.before_deploy, &self.before_deploy),
            after_deploy: pick(&over.after_deploy, &self.after_deploy),
            dependencies: pick(&over.dependencies, &self.dependencies),
            delete_rolled_back: pick(&over.delete_rolled_back, &self.delete_rolled_back),
            debug: pick(&over.debug, &self.debug),
            command_timeout: pick(&over.command_timeout, &self.command_timeout),
            transfer_timeout: pick(&over.transfer_timeout, &self.transfer_timeout),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Options for `environment`, or the top-level options when `None`.
    pub fn for_environment(&self, environment: Option<&str>) -> Result<Options> {
        match environment {
            None => Ok(self.options.clone()),
            Some(name) => {
                let over = self
                    .environments
                    .get(name)
                    .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;
                Ok(self.options.overlay(over))
            }
        }
    }

    /// Resolve options for `environment` into connection-ready settings.
    pub fn settings(&self, environment: Option<&str>) -> Result<DeploySettings> {
        DeploySettings::from_options(&self.for_environment(environment)?)
    }

    pub fn environment_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.environments.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
