// ABOUTME: User-configured remote commands around a release.
// ABOUTME: Hooks run in listed order on the target and stop at the first failure.

use crate::deploy::{CommandRunner, DeployError, Step};
use serde::Deserialize;

/// Hook execution points in the release lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Before the release directory is created.
    BeforeDeploy,
    /// After the new release is live and its dependencies are in place.
    AfterDeploy,
}

impl HookPoint {
    /// Config key for this point.
    pub fn key(&self) -> &'static str {
        match self {
            HookPoint::BeforeDeploy => "before_deploy",
            HookPoint::AfterDeploy => "after_deploy",
        }
    }

    /// Pipeline step the hooks run as.
    pub fn step(&self) -> Step {
        match self {
            HookPoint::BeforeDeploy => Step::BeforeHooks,
            HookPoint::AfterDeploy => Step::AfterHooks,
        }
    }
}

/// Ordered hook commands. Accepts a single string or a list in config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookList(Vec<String>);

impl HookList {
    /// Blank commands are dropped.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            commands
                .into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.trim().is_empty())
                .collect(),
        )
    }

    pub fn commands(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for HookList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Entry::deserialize(deserializer)? {
            Entry::One(command) => HookList::new([command]),
            Entry::Many(commands) => HookList::new(commands),
        })
    }
}

/// Run `hooks` for `point` in order. The first failure stops the rest.
pub async fn run_hooks(
    runner: &CommandRunner<'_>,
    point: HookPoint,
    hooks: &HookList,
) -> Result<(), DeployError> {
    if hooks.is_empty() {
        return Ok(());
    }

    tracing::info!("Running {} hooks ({})", point.key(), hooks.commands().len());
    for command in hooks.commands() {
        runner.run(point.step(), command).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_point_maps_to_step() {
        assert_eq!(HookPoint::BeforeDeploy.step(), Step::BeforeHooks);
        assert_eq!(HookPoint::AfterDeploy.step(), Step::AfterHooks);
        assert_eq!(HookPoint::AfterDeploy.key(), "after_deploy");
    }

    #[test]
    fn deserializes_single_string() {
        let hooks: HookList = serde_yaml::from_str("\"npm run build\"").unwrap();
        assert_eq!(hooks.commands(), &["npm run build"]);
    }

    #[test]
    fn deserializes_list_in_order() {
        let hooks: HookList = serde_yaml::from_str("- echo a\n- exit 1\n").unwrap();
        assert_eq!(hooks.commands(), &["echo a", "exit 1"]);
    }

    #[test]
    fn blank_commands_are_dropped() {
        let hooks: HookList = serde_yaml::from_str("\"\"").unwrap();
        assert!(hooks.is_empty());
        assert_eq!(HookList::new(["  ", "echo ok"]).commands(), &["echo ok"]);
    }
}
