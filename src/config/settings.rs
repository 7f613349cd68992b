// ABOUTME: Resolved, validated settings for one environment.
// ABOUTME: Bridges config options to connection plans and pipeline contexts.

use super::{Options, default_command_timeout, default_transfer_timeout};
use crate::deploy::{DependencyPolicy, PipelineContext, RemoteLayout, RollbackContext};
use crate::error::{Error, Result};
use crate::hooks::HookList;
use crate::ssh::ConnectionConfig;
use crate::types::{LinkName, ReleaseLabel};
use std::path::PathBuf;

/// Settings for one run, with credentials already resolved.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub connection: ConnectionConfig,
    pub layout: RemoteLayout,
    pub local_path: Option<PathBuf>,
    pub version_label: Option<ReleaseLabel>,
    pub keep: Option<usize>,
    pub before_deploy: HookList,
    pub after_deploy: HookList,
    pub dependencies: DependencyPolicy,
    pub delete_rolled_back: bool,
    pub debug: bool,
}

impl DeploySettings {
    /// Validate `options`. Fails before any network access when the server,
    /// deploy path, or credentials are missing.
    pub fn from_options(options: &Options) -> Result<Self> {
        let server = options.server.as_ref().ok_or(Error::MissingField("server"))?;
        let deploy_path = options
            .deploy_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(Error::MissingField("deploy_path"))?;

        let connection = server.connection_config(
            options.command_timeout.unwrap_or_else(default_command_timeout),
            options.transfer_timeout.unwrap_or_else(default_transfer_timeout),
        )?;

        let link = options.current_symlink.clone().unwrap_or_else(LinkName::current);

        Ok(Self {
            connection,
            layout: RemoteLayout::new(deploy_path, link),
            local_path: options.local_path.clone(),
            version_label: options.version_label.clone(),
            keep: options.keep,
            before_deploy: options.before_deploy.clone().unwrap_or_default(),
            after_deploy: options.after_deploy.clone().unwrap_or_default(),
            dependencies: options
                .dependencies
                .as_ref()
                .map(|d| d.policy())
                .unwrap_or(DependencyPolicy::Disabled),
            delete_rolled_back: options.delete_rolled_back.unwrap_or(false),
            debug: options.debug.unwrap_or(false),
        })
    }

    /// Context for a release. `label` overrides the configured label; with
    /// neither, the label is taken from the clock.
    pub fn release_context(&self, label: Option<ReleaseLabel>) -> Result<PipelineContext> {
        let local_path = self
            .local_path
            .clone()
            .ok_or(Error::MissingField("local_path"))?;
        let label = label
            .or_else(|| self.version_label.clone())
            .unwrap_or_else(ReleaseLabel::timestamp);

        if self.dependencies.dir().map(|d| d.as_str()) == Some(label.as_str())
            || self.layout.link_name().as_str() == label.as_str()
        {
            return Err(Error::InvalidConfig(format!(
                "release label {} collides with a reserved name",
                label
            )));
        }

        Ok(PipelineContext {
            layout: self.layout.clone(),
            label,
            local_path,
            keep: self.keep,
            before_deploy: self.before_deploy.clone(),
            after_deploy: self.after_deploy.clone(),
            dependencies: self.dependencies.clone(),
        })
    }

    pub fn rollback_context(&self) -> RollbackContext {
        RollbackContext {
            layout: self.layout.clone(),
            dependencies: self.dependencies.clone(),
            delete_rolled_back: self.delete_rolled_back,
        }
    }
}
