//! Deploy pipeline tests against in-memory runtime and router doubles

mod support;

use launchpad::ports::PortRange;
use launchpad::project::{NewProject, ProjectKind, ProjectStatus, SourceOrigin};
use launchpad::recipe::GENERATED_RECIPE_FILE;
use launchpad::deploy::DeployTimeouts;
use launchpad::DeployError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use support::{FailingUpdateStore, TestHarness, Unit};

fn static_site(name: &str, source: &std::path::Path) -> NewProject {
    NewProject::new(name, ProjectKind::Static, SourceOrigin::Local(source.to_path_buf()))
}

fn service(name: &str, source: &std::path::Path) -> NewProject {
    NewProject::new(
        name,
        ProjectKind::ServerSide,
        SourceOrigin::Local(source.to_path_buf()),
    )
}

#[tokio::test]
async fn test_static_deploy_publishes_workdir() {
    let harness = TestHarness::new();
    let source = harness.source("docs", &[("index.html", "<h1>hello</h1>")]);

    let project = harness
        .orchestrator
        .create(static_site("docs", &source))
        .await
        .unwrap();
    assert_eq!(project.port, None);

    let project = harness.orchestrator.deploy(project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Running);
    assert_eq!(project.error_message, None);

    let workdir = harness.orchestrator.workdir(&project);
    assert!(workdir.join("index.html").is_file());
    let canonical = std::fs::canonicalize(&workdir).unwrap();
    assert_eq!(harness.router.unit("docs"), Some(Unit::Static(canonical)));
    assert!(harness.runtime.builds().is_empty());
}

#[tokio::test]
async fn test_node_project_gets_generated_recipe() {
    let harness = TestHarness::new();
    let source = harness.source(
        "api",
        &[
            ("package.json", r#"{"name": "api", "scripts": {"start": "node index.js"}}"#),
            ("index.js", "require('http').createServer().listen(80)"),
        ],
    );

    let project = harness
        .orchestrator
        .create(service("api", &source))
        .await
        .unwrap();
    let port = project.port.unwrap();

    let project = harness.orchestrator.deploy(project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Running);

    let builds = harness.runtime.builds();
    assert_eq!(builds.len(), 1);
    assert!(builds[0].recipe_text.starts_with("FROM node"));
    assert!(builds[0].recipe_text.contains(r#"CMD ["npm", "start"]"#));
    assert_eq!(builds[0].image_tag, "launchpad-api:latest");
    assert!(builds[0].recipe.ends_with(GENERATED_RECIPE_FILE));
    assert_eq!(project.recipe_path.as_deref(), Some(builds[0].recipe.as_path()));

    let container = harness.runtime.container_named("launchpad-api").unwrap();
    assert_eq!(container.port, port);
    assert_eq!(project.runtime_handle.unwrap().as_str(), container.id);
    assert_eq!(harness.router.unit("api"), Some(Unit::Proxy(port)));
}

#[tokio::test]
async fn test_launch_command_overrides_stack_default() {
    let harness = TestHarness::new();
    let source = harness.source("api", &[("package.json", "{}"), ("server.js", "")]);

    let project = harness
        .orchestrator
        .create(service("api", &source).with_launch_command("node server.js"))
        .await
        .unwrap();
    harness.orchestrator.deploy(project.id).await.unwrap();

    let builds = harness.runtime.builds();
    assert!(builds[0].recipe_text.contains("CMD node server.js"));
    assert!(!builds[0].recipe_text.contains("npm\", \"start"));
}

#[tokio::test]
async fn test_user_dockerfile_is_used_as_is() {
    let harness = TestHarness::new();
    let dockerfile = "FROM alpine:3.19\nEXPOSE 80\nCMD [\"httpd\", \"-f\"]\n";
    let source = harness.source("web", &[("Dockerfile", dockerfile), ("package.json", "{}")]);

    let project = harness
        .orchestrator
        .create(service("web", &source))
        .await
        .unwrap();
    harness.orchestrator.deploy(project.id).await.unwrap();

    let builds = harness.runtime.builds();
    assert_eq!(builds[0].recipe_text, dockerfile);
    assert!(builds[0].recipe.ends_with("Dockerfile"));
}

#[tokio::test]
async fn test_build_failure_marks_project_failed() {
    let harness = TestHarness::new();
    let source = harness.source("api", &[("package.json", "{}")]);
    let created = harness
        .orchestrator
        .create(service("api", &source))
        .await
        .unwrap();

    harness.runtime.fail_builds(true);
    let err = harness.orchestrator.deploy(created.id).await.unwrap_err();
    assert!(matches!(err, DeployError::Build(_)));

    let project = harness.orchestrator.get(created.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
    assert!(project
        .error_message
        .as_deref()
        .is_some_and(|msg| msg.contains("npm install exited with 1")));
    assert_eq!(project.port, created.port);
    assert_eq!(project.name, "api");
    assert!(harness.runtime.containers().is_empty());
    assert_eq!(harness.router.unit("api"), None);
}

#[tokio::test]
async fn test_failed_deploy_can_be_retried() {
    let harness = TestHarness::new();
    let source = harness.source("api", &[("go.mod", "module api\n")]);
    let project = harness
        .orchestrator
        .create(service("api", &source))
        .await
        .unwrap();

    harness.runtime.fail_builds(true);
    assert!(harness.orchestrator.deploy(project.id).await.is_err());

    harness.runtime.fail_builds(false);
    let project = harness.orchestrator.deploy(project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Running);
    assert_eq!(project.error_message, None);
}

#[tokio::test]
async fn test_rejected_routing_fails_deploy() {
    let harness = TestHarness::new();
    let source = harness.source("docs", &[("index.html", "ok")]);
    let project = harness
        .orchestrator
        .create(static_site("docs", &source))
        .await
        .unwrap();

    harness.router.reject(true);
    let err = harness.orchestrator.deploy(project.id).await.unwrap_err();
    assert!(matches!(err, DeployError::Routing(_)));
    let project = harness.orchestrator.get(project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
}

#[tokio::test]
async fn test_missing_local_source_fails_deploy() {
    let harness = TestHarness::new();
    let missing = harness.dir.path().join("nowhere");
    let project = harness
        .orchestrator
        .create(static_site("docs", &missing))
        .await
        .unwrap();

    let err = harness.orchestrator.deploy(project.id).await.unwrap_err();
    assert!(matches!(err, DeployError::SourceNotFound(path) if path == missing));
    let project = harness.orchestrator.get(project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
    assert!(project.error_message.is_some());
}

#[tokio::test]
async fn test_redeploy_replaces_workdir_and_instance() {
    let harness = TestHarness::new();
    let source = harness.source("api", &[("package.json", "{}"), ("old.js", "")]);
    let project = harness
        .orchestrator
        .create(service("api", &source))
        .await
        .unwrap();
    let first = harness.orchestrator.deploy(project.id).await.unwrap();

    std::fs::remove_file(source.join("old.js")).unwrap();
    std::fs::write(source.join("new.js"), "").unwrap();
    let second = harness.orchestrator.deploy(project.id).await.unwrap();

    let workdir = harness.orchestrator.workdir(&second);
    assert!(workdir.join("new.js").is_file());
    assert!(!workdir.join("old.js").exists());

    assert_eq!(harness.runtime.containers().len(), 1);
    assert_ne!(first.runtime_handle, second.runtime_handle);
    assert_eq!(second.port, first.port);
}

#[tokio::test]
async fn test_server_side_projects_get_distinct_ports() {
    let harness = TestHarness::new();
    let source = harness.source("svc", &[("app.py", "")]);

    let mut ports = HashSet::new();
    for i in 0..20 {
        let project = harness
            .orchestrator
            .create(service(&format!("svc-{}", i), &source))
            .await
            .unwrap();
        let port = project.port.unwrap();
        assert!((12000..=12999).contains(&port));
        assert!(ports.insert(port), "port {} assigned twice", port);
    }
}

#[tokio::test]
async fn test_port_exhaustion() {
    let harness = TestHarness::with_port_range(PortRange::new(12000, 12001));
    let source = harness.source("svc", &[("app.py", "")]);

    for name in ["one", "two"] {
        harness
            .orchestrator
            .create(service(name, &source))
            .await
            .unwrap();
    }
    let err = harness
        .orchestrator
        .create(service("three", &source))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeployError::ResourceExhausted {
            start: 12000,
            end: 12001
        }
    ));
    assert!(harness.orchestrator.get_by_name("three").await.is_err());

    // static projects need no port
    harness
        .orchestrator
        .create(static_site("docs", &source))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_concurrent_creates_get_distinct_ports() {
    let harness = TestHarness::with_port_range(PortRange::new(12000, 12015));
    let source = harness.source("svc", &[("app.py", "")]);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let orchestrator = Arc::clone(&harness.orchestrator);
        let source = source.clone();
        tasks.push(tokio::spawn(async move {
            orchestrator
                .create(service(&format!("svc-{}", i), &source))
                .await
        }));
    }

    let mut ports = HashSet::new();
    for task in tasks {
        let project = task.await.unwrap().unwrap();
        assert!(ports.insert(project.port.unwrap()));
    }
    assert_eq!(ports.len(), 16);
}

#[tokio::test]
async fn test_build_timeout_marks_project_failed() {
    let harness = TestHarness::with_timeouts(DeployTimeouts {
        build: Duration::from_millis(200),
        ..DeployTimeouts::default()
    });
    let source = harness.source("api", &[("package.json", "{}")]);
    let project = harness
        .orchestrator
        .create(service("api", &source))
        .await
        .unwrap();

    harness.runtime.slow_builds(Duration::from_secs(30));
    let err = harness.orchestrator.deploy(project.id).await.unwrap_err();
    assert!(matches!(err, DeployError::Timeout { step: "build image", .. }));

    let project = harness.orchestrator.get(project.id).await.unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
    assert_eq!(
        project.error_message.as_deref(),
        Some("build image timed out after 200ms")
    );
    assert!(harness.runtime.containers().is_empty());
}

#[tokio::test]
async fn test_store_failure_on_completion_does_not_leave_building() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = dir.path().join("site");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("index.html"), "ok").unwrap();

    // static deploy: update 1 marks BUILDING, update 2 would record RUNNING
    let store = Arc::new(FailingUpdateStore::failing_update(2));
    let harness = TestHarness::with_store(dir, store.clone(), PortRange::new(12000, 12999));
    let project = harness
        .orchestrator
        .create(static_site("docs", &source))
        .await
        .unwrap();

    let err = harness.orchestrator.deploy(project.id).await.unwrap_err();
    assert!(matches!(err, DeployError::Store(_)));

    let stored = store.stored(project.id).await.unwrap();
    assert_eq!(stored.status, ProjectStatus::Failed);
    assert!(stored
        .error_message
        .as_deref()
        .is_some_and(|msg| msg.contains("No space left on device")));
}
