// ABOUTME: End-to-end pipeline tests against a real shell in a temporary directory.
// ABOUTME: Checks the resulting filesystem: release dirs, live symlink, dependencies.

mod support;

use slipway::deploy::{
    DependencyPolicy, PipelineContext, ReleasePipeline, RemoteLayout, RollbackContext,
    RollbackPipeline,
};
use slipway::diagnostics::Diagnostics;
use slipway::events::NullSink;
use slipway::hooks::HookList;
use slipway::types::{DirName, LinkName, ReleaseLabel};
use std::sync::Arc;
use std::time::Duration;
use support::LocalHost;

const HOUR: Duration = Duration::from_secs(3600);

fn context(host: &LocalHost, label: &str) -> PipelineContext {
    PipelineContext {
        layout: RemoteLayout::new(host.deploy_path_str(), LinkName::current()),
        label: ReleaseLabel::new(label).unwrap(),
        local_path: host.artifact(&[("index.js", "console.log('hi')"), ("lib/util.js", "")]),
        keep: None,
        before_deploy: HookList::default(),
        after_deploy: HookList::default(),
        dependencies: DependencyPolicy::Disabled,
    }
}

/// Four releases, oldest first, with the newest live.
fn seed_four(host: &LocalHost) {
    host.seed_release("202312010000", 4 * HOUR);
    host.seed_release("202312020000", 3 * HOUR);
    host.seed_release("202312030000", 2 * HOUR);
    host.seed_release("202312040000", HOUR);
    host.link("current", "202312040000");
}

async fn deploy(host: &LocalHost, ctx: &PipelineContext) -> Result<slipway::deploy::DeployReport, slipway::deploy::DeployError> {
    ReleasePipeline::new(ctx, host, Arc::new(NullSink))
        .run(&mut Diagnostics::default())
        .await
}

/// Test: keep = 2 with four existing releases.
/// Expected: New release live with the artifact, oldest release pruned.
#[tokio::test]
async fn deploy_switches_and_prunes() {
    let host = LocalHost::new();
    seed_four(&host);
    let mut ctx = context(&host, "202401011200");
    ctx.keep = Some(2);

    let report = deploy(&host, &ctx).await.expect("deploy should succeed");

    assert_eq!(report.pruned.as_deref(), Some("202312010000"));
    assert_eq!(host.live("current").as_deref(), Some("202401011200"));
    assert_eq!(
        host.release_dirs(),
        vec!["202312020000", "202312030000", "202312040000", "202401011200"]
    );
    let release = host.deploy_path().join("202401011200");
    assert!(release.join("index.js").is_file());
    assert!(release.join("lib").join("util.js").is_file());
    assert_eq!(host.close_count(), 1);
}

/// Test: before_deploy = ["echo a", "exit 1"].
/// Expected: No new directory, symlink unchanged.
#[tokio::test]
async fn failing_before_hook_leaves_target_untouched() {
    let host = LocalHost::new();
    seed_four(&host);
    let mut ctx = context(&host, "202401011200");
    ctx.before_deploy = HookList::new(["echo a", "exit 1"]);

    let err = deploy(&host, &ctx).await.expect_err("deploy should fail");

    assert_eq!(err.failure().unwrap().command, "exit 1");
    assert_eq!(host.live("current").as_deref(), Some("202312040000"));
    assert!(!host.deploy_path().join("202401011200").exists());
}

/// Test: after_deploy hook fails once the new release is live.
/// Expected: Symlink back on the previous release and the new release removed.
#[tokio::test]
async fn failing_after_hook_restores_previous_release() {
    let host = LocalHost::new();
    seed_four(&host);
    let mut ctx = context(&host, "202401011200");
    ctx.after_deploy = HookList::new(["test -f current/missing.txt"]);

    deploy(&host, &ctx).await.expect_err("deploy should fail");

    assert_eq!(host.live("current").as_deref(), Some("202312040000"));
    assert!(!host.deploy_path().join("202401011200").exists());
    assert_eq!(host.release_dirs().len(), 4);
}

/// Test: First deploy fails after the symlink was created.
/// Expected: No symlink and no release directory remain.
#[tokio::test]
async fn failed_first_deploy_leaves_nothing_behind() {
    let host = LocalHost::new();
    let mut ctx = context(&host, "202401011200");
    ctx.after_deploy = HookList::new(["false"]);

    deploy(&host, &ctx).await.expect_err("deploy should fail");

    assert_eq!(host.live("current"), None);
    assert!(host.release_dirs().is_empty());
}

/// Test: Reuse mode with dependencies in the live release.
/// Expected: Dependencies moved into the new release, nothing left in holding.
#[tokio::test]
async fn reuse_mode_moves_dependencies_forward() {
    let host = LocalHost::new();
    let previous = host.seed_release("202312040000", HOUR);
    std::fs::create_dir(previous.join("node_modules")).unwrap();
    std::fs::write(previous.join("node_modules").join("pkg.txt"), "cached").unwrap();
    host.link("current", "202312040000");

    let mut ctx = context(&host, "202401011200");
    ctx.dependencies = DependencyPolicy::Reuse {
        dir: DirName::node_modules(),
        install: "touch installed".to_string(),
    };

    deploy(&host, &ctx).await.expect("deploy should succeed");

    let release = host.deploy_path().join("202401011200");
    assert_eq!(
        std::fs::read_to_string(release.join("node_modules").join("pkg.txt")).unwrap(),
        "cached"
    );
    assert!(!host.deploy_path().join("node_modules").exists());
    assert!(!release.join("installed").exists());
}

/// Test: Reuse mode, after_deploy hook fails once dependencies were moved into the new release.
/// Expected: Previous release live again with its dependencies intact.
#[tokio::test]
async fn failed_reuse_deploy_keeps_previous_dependencies() {
    let host = LocalHost::new();
    let previous = host.seed_release("202312040000", HOUR);
    std::fs::create_dir(previous.join("node_modules")).unwrap();
    std::fs::write(previous.join("node_modules").join("pkg.txt"), "cached").unwrap();
    host.link("current", "202312040000");

    let mut ctx = context(&host, "202401011200");
    ctx.dependencies = DependencyPolicy::Reuse {
        dir: DirName::node_modules(),
        install: "touch installed".to_string(),
    };
    ctx.after_deploy = HookList::new(["false"]);

    deploy(&host, &ctx).await.expect_err("deploy should fail");

    assert_eq!(host.live("current").as_deref(), Some("202312040000"));
    assert_eq!(
        std::fs::read_to_string(previous.join("node_modules").join("pkg.txt")).unwrap(),
        "cached"
    );
    assert!(!host.deploy_path().join("202401011200").exists());
    assert!(!host.deploy_path().join("node_modules").exists());
}

/// Test: The live release already carries the label being deployed, and a hook fails.
/// Expected: The live release and its contents survive.
#[tokio::test]
async fn live_release_with_same_label_survives_failed_deploy() {
    let host = LocalHost::new();
    let live = host.seed_release("202401011200", HOUR);
    std::fs::write(live.join("index.js"), "live").unwrap();
    host.link("current", "202401011200");

    let mut ctx = context(&host, "202401011200");
    ctx.before_deploy = HookList::new(["exit 1"]);
    deploy(&host, &ctx).await.expect_err("deploy should fail");

    assert_eq!(host.live("current").as_deref(), Some("202401011200"));
    assert_eq!(std::fs::read_to_string(live.join("index.js")).unwrap(), "live");
}

/// Test: Deploying a label that already exists on the target.
/// Expected: Refused at CreateReleaseDir; nothing is uploaded into the live release.
#[tokio::test]
async fn existing_label_is_refused() {
    let host = LocalHost::new();
    let live = host.seed_release("202401011200", HOUR);
    std::fs::write(live.join("index.js"), "live").unwrap();
    host.link("current", "202401011200");

    let ctx = context(&host, "202401011200");
    let err = deploy(&host, &ctx).await.expect_err("deploy should fail");

    assert_eq!(err.step(), slipway::deploy::Step::CreateReleaseDir);
    assert!(err.failure().unwrap().stderr.contains("already exists"));
    assert_eq!(host.live("current").as_deref(), Some("202401011200"));
    assert_eq!(std::fs::read_to_string(live.join("index.js")).unwrap(), "live");
    assert!(!live.join("lib").exists());
}

/// Test: Reinstall mode.
/// Expected: Install command runs inside the live release.
#[tokio::test]
async fn reinstall_mode_runs_install_in_live_release() {
    let host = LocalHost::new();
    let mut ctx = context(&host, "202401011200");
    ctx.dependencies = DependencyPolicy::Reinstall {
        dir: DirName::node_modules(),
        install: "mkdir -p node_modules && touch node_modules/fresh".to_string(),
    };

    deploy(&host, &ctx).await.expect("deploy should succeed");

    assert!(
        host.deploy_path()
            .join("202401011200")
            .join("node_modules")
            .join("fresh")
            .is_file()
    );
}

/// Test: Deploy a release, then roll back with deletion.
/// Expected: Previous release live again and the rolled-back release gone.
#[tokio::test]
async fn rollback_after_deploy_restores_previous() {
    let host = LocalHost::new();
    seed_four(&host);
    let ctx = context(&host, "202401011200");
    deploy(&host, &ctx).await.expect("deploy should succeed");

    let rollback = RollbackContext {
        layout: ctx.layout.clone(),
        dependencies: DependencyPolicy::Disabled,
        delete_rolled_back: true,
    };
    let report = RollbackPipeline::new(&rollback, &host, Arc::new(NullSink))
        .run(&mut Diagnostics::default())
        .await
        .expect("rollback should succeed");

    assert_eq!(report.to, "202312040000");
    assert_eq!(host.live("current").as_deref(), Some("202312040000"));
    assert!(!host.deploy_path().join("202401011200").exists());
    assert_eq!(host.close_count(), 2);
}
