//! In-process runtime and router doubles plus orchestrator fixtures.
//!
//! The doubles keep their state in memory so pipeline tests run without Docker or nginx.

#![allow(dead_code)]

use async_trait::async_trait;
use launchpad::cleanup::Removal;
use launchpad::deploy::{DeployTimeouts, Orchestrator, OrchestratorSettings};
use launchpad::ports::PortRange;
use launchpad::progress::NoOpHandler;
use launchpad::project::{InstanceHandle, Project, ProjectId};
use launchpad::routing::{ReloadOutcome, RoutingError, TrafficRouter};
use launchpad::runtime::{RuntimeError, RuntimeProvisioner};
use launchpad::store::{MemoryStore, ProjectStore, StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct BuildRecord {
    pub recipe: PathBuf,
    pub recipe_text: String,
    pub image_tag: String,
    pub context_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub image_tag: String,
    pub port: u16,
    pub running: bool,
}

/// Container runtime double. Instances are addressable by id or by name, like Docker.
#[derive(Default)]
pub struct FakeRuntime {
    builds: Mutex<Vec<BuildRecord>>,
    containers: Mutex<Vec<FakeContainer>>,
    next_id: AtomicU64,
    fail_builds: AtomicBool,
    fail_starts: AtomicBool,
    build_delay_ms: AtomicU64,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_builds(&self, fail: bool) {
        self.fail_builds.store(fail, Ordering::SeqCst);
    }

    /// Makes every build take at least `delay`
    pub fn slow_builds(&self, delay: Duration) {
        self.build_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail_starts(&self, fail: bool) {
        self.fail_starts.store(fail, Ordering::SeqCst);
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.builds.lock().unwrap().clone()
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.containers.lock().unwrap().clone()
    }

    pub fn container_named(&self, name: &str) -> Option<FakeContainer> {
        self.containers().into_iter().find(|c| c.name == name)
    }

    /// Simulates the container being removed behind launchpad's back
    pub fn forget_all(&self) {
        self.containers.lock().unwrap().clear();
    }

    fn matches(container: &FakeContainer, handle: &InstanceHandle) -> bool {
        container.id == handle.as_str() || container.name == handle.as_str()
    }
}

#[async_trait]
impl RuntimeProvisioner for FakeRuntime {
    async fn build(
        &self,
        recipe: &Path,
        image_tag: &str,
        context_dir: &Path,
    ) -> Result<(), RuntimeError> {
        let delay = self.build_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(RuntimeError::Build(
                "step 3/5: npm install exited with 1".to_string(),
            ));
        }
        let recipe_text = tokio::fs::read_to_string(recipe)
            .await
            .map_err(|e| RuntimeError::Build(e.to_string()))?;
        self.builds.lock().unwrap().push(BuildRecord {
            recipe: recipe.to_path_buf(),
            recipe_text,
            image_tag: image_tag.to_string(),
            context_dir: context_dir.to_path_buf(),
        });
        Ok(())
    }

    async fn start(
        &self,
        image_tag: &str,
        instance_name: &str,
        external_port: u16,
    ) -> Result<InstanceHandle, RuntimeError> {
        if self.fail_starts.load(Ordering::SeqCst) {
            return Err(RuntimeError::Provision(format!(
                "port {} is already allocated",
                external_port
            )));
        }
        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut containers = self.containers.lock().unwrap();
        containers.retain(|c| c.name != instance_name);
        containers.push(FakeContainer {
            id: id.clone(),
            name: instance_name.to_string(),
            image_tag: image_tag.to_string(),
            port: external_port,
            running: true,
        });
        Ok(InstanceHandle(id))
    }

    async fn resume(&self, handle: &InstanceHandle) -> Result<bool, RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        match containers.iter_mut().find(|c| Self::matches(c, handle)) {
            Some(container) => {
                container.running = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn stop(&self, handle: &InstanceHandle) -> Result<bool, RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        match containers.iter_mut().find(|c| Self::matches(c, handle)) {
            Some(container) => {
                container.running = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, handle: &InstanceHandle) -> Result<Removal, RuntimeError> {
        let mut containers = self.containers.lock().unwrap();
        let before = containers.len();
        containers.retain(|c| !Self::matches(c, handle));
        if containers.len() < before {
            Ok(Removal::Removed)
        } else {
            Ok(Removal::AlreadyAbsent)
        }
    }

    async fn status(&self, handle: &InstanceHandle) -> Result<Option<String>, RuntimeError> {
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| Self::matches(c, handle))
            .map(|c| if c.running { "running" } else { "exited" }.to_string()))
    }

    async fn logs(
        &self,
        handle: &InstanceHandle,
        _tail: usize,
    ) -> Result<Option<String>, RuntimeError> {
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .find(|c| Self::matches(c, handle))
            .map(|c| format!("{} listening on :80\n", c.name)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Static(PathBuf),
    Proxy(u16),
}

/// Router double keyed by hostname prefix
#[derive(Default)]
pub struct FakeRouter {
    units: Mutex<HashMap<String, Unit>>,
    reject: AtomicBool,
}

impl FakeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn unit(&self, prefix: &str) -> Option<Unit> {
        self.units.lock().unwrap().get(prefix).cloned()
    }

    pub fn unit_count(&self) -> usize {
        self.units.lock().unwrap().len()
    }

    fn publish(&self, prefix: &str, unit: Unit) -> Result<ReloadOutcome, RoutingError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(RoutingError::Rejected(format!(
                "unknown directive in {}.conf",
                prefix
            )));
        }
        self.units.lock().unwrap().insert(prefix.to_string(), unit);
        Ok(ReloadOutcome::Reloaded)
    }
}

#[async_trait]
impl TrafficRouter for FakeRouter {
    async fn publish_static(
        &self,
        prefix: &str,
        root: &Path,
    ) -> Result<ReloadOutcome, RoutingError> {
        self.publish(prefix, Unit::Static(root.to_path_buf()))
    }

    async fn publish_proxy(&self, prefix: &str, port: u16) -> Result<ReloadOutcome, RoutingError> {
        self.publish(prefix, Unit::Proxy(port))
    }

    async fn unpublish(&self, prefix: &str) -> Result<Removal, RoutingError> {
        match self.units.lock().unwrap().remove(prefix) {
            Some(_) => Ok(Removal::Removed),
            None => Ok(Removal::AlreadyAbsent),
        }
    }
}

/// `MemoryStore` whose Nth `update` call fails once
pub struct FailingUpdateStore {
    inner: MemoryStore,
    updates: AtomicU64,
    fail_at: u64,
}

impl FailingUpdateStore {
    pub fn failing_update(fail_at: u64) -> Self {
        Self {
            inner: MemoryStore::new(),
            updates: AtomicU64::new(0),
            fail_at,
        }
    }

    /// The stored record, bypassing the injected failure
    pub async fn stored(&self, id: ProjectId) -> Option<Project> {
        self.inner.get(id).await.unwrap()
    }
}

#[async_trait]
impl ProjectStore for FailingUpdateStore {
    async fn insert(&self, project: Project) -> StoreResult<Project> {
        self.inner.insert(project).await
    }

    async fn get(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        self.inner.get(id).await
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        self.inner.get_by_name(name).await
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        self.inner.list().await
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        if self.updates.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            )));
        }
        self.inner.update(project).await
    }

    async fn delete(&self, id: ProjectId) -> StoreResult<()> {
        self.inner.delete(id).await
    }

    async fn used_ports(&self) -> StoreResult<HashSet<u16>> {
        self.inner.used_ports().await
    }
}

/// An orchestrator wired to the doubles, with every path under one temp directory
pub struct TestHarness {
    pub dir: TempDir,
    pub runtime: Arc<FakeRuntime>,
    pub router: Arc<FakeRouter>,
    pub orchestrator: Arc<Orchestrator>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_port_range(PortRange::new(12000, 12999))
    }

    pub fn with_port_range(range: PortRange) -> Self {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn ProjectStore> = Arc::new(MemoryStore::new());
        Self::with_store(dir, store, range)
    }

    pub fn with_store(dir: TempDir, store: Arc<dyn ProjectStore>, range: PortRange) -> Self {
        let settings = OrchestratorSettings::new(dir.path().join("projects")).with_port_range(range);
        Self::with_settings(dir, store, settings)
    }

    pub fn with_timeouts(timeouts: DeployTimeouts) -> Self {
        let dir = TempDir::new().unwrap();
        let settings = OrchestratorSettings::new(dir.path().join("projects"))
            .with_port_range(PortRange::new(12000, 12999))
            .with_timeouts(timeouts);
        Self::with_settings(dir, Arc::new(MemoryStore::new()), settings)
    }

    pub fn with_settings(
        dir: TempDir,
        store: Arc<dyn ProjectStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        let runtime = Arc::new(FakeRuntime::new());
        let router = Arc::new(FakeRouter::new());
        let orchestrator = Orchestrator::new(store, runtime.clone(), router.clone(), settings)
            .with_progress(Arc::new(NoOpHandler));
        Self {
            dir,
            runtime,
            router,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Creates a source directory under the temp dir with the given files
    pub fn source(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = self.dir.path().join("sources").join(name);
        for (path, contents) in files {
            let path = root.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        std::fs::create_dir_all(&root).unwrap();
        root
    }
}
