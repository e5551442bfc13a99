use super::{state, OrchestratorSettings};
use crate::cleanup::{CleanupReport, Removal, StepOutcome};
use crate::error::{DeployError, DeployResult};
use crate::ports::PortAllocator;
use crate::progress::{DeployEvent, DeployStep, LoggingHandler, ProgressHandler};
use crate::project::{
    validate_hostname_prefix, validate_name, InstanceHandle, NewProject, Project, ProjectId,
    ProjectStatus, ProjectUpdate, SourceOrigin,
};
use crate::recipe::RecipeSynthesizer;
use crate::routing::TrafficRouter;
use crate::runtime::RuntimeProvisioner;
use crate::source::SourceAcquirer;
use crate::store::ProjectStore;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// A deploy step that went wrong, and which one
struct StepFailure {
    step: DeployStep,
    error: DeployError,
}

/// Drives projects through their lifecycle.
///
/// Operations on one project are serialized by a per-project lock held for the whole
/// operation. Creation additionally takes a global lock so the uniqueness checks, the port
/// snapshot and the insert happen as one unit.
pub struct Orchestrator {
    store: Arc<dyn ProjectStore>,
    runtime: Arc<dyn RuntimeProvisioner>,
    router: Arc<dyn TrafficRouter>,
    acquirer: SourceAcquirer,
    synthesizer: RecipeSynthesizer,
    allocator: PortAllocator,
    progress: Arc<dyn ProgressHandler>,
    settings: OrchestratorSettings,
    allocation_lock: tokio::sync::Mutex<()>,
    project_locks: Mutex<HashMap<ProjectId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        runtime: Arc<dyn RuntimeProvisioner>,
        router: Arc<dyn TrafficRouter>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            runtime,
            router,
            acquirer: SourceAcquirer::new().with_git_binary(settings.git_bin.clone()),
            synthesizer: RecipeSynthesizer::with_defaults(),
            allocator: PortAllocator::new(settings.port_range),
            progress: Arc::new(LoggingHandler),
            settings,
            allocation_lock: tokio::sync::Mutex::new(()),
            project_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: RecipeSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Working directory holding the project's acquired source
    pub fn workdir(&self, project: &Project) -> PathBuf {
        self.settings.projects_dir.join(&project.name)
    }

    pub fn hostname(&self, project: &Project) -> String {
        project.hostname(&self.settings.domain)
    }

    /// Validates and stores a new project. Server-side projects get their port here.
    #[instrument(skip_all, fields(project = %new.name))]
    pub async fn create(&self, new: NewProject) -> DeployResult<Project> {
        validate_name(&new.name)?;
        let prefix = new
            .hostname_prefix
            .clone()
            .unwrap_or_else(|| new.name.clone());
        validate_hostname_prefix(&prefix)?;
        let source_missing = match &new.source {
            SourceOrigin::Local(path) => path.as_os_str().is_empty(),
            SourceOrigin::Git(url) => url.trim().is_empty(),
        };
        if source_missing {
            return Err(DeployError::validation("Source location must not be empty"));
        }

        let _allocation = self.allocation_lock.lock().await;

        if self.store.get_by_name(&new.name).await?.is_some() {
            return Err(DeployError::validation(format!(
                "Project '{}' already exists",
                new.name
            )));
        }
        if let Some(owner) = self
            .store
            .list()
            .await?
            .into_iter()
            .find(|p| p.hostname_prefix == prefix)
        {
            return Err(DeployError::validation(format!(
                "Hostname prefix '{}' already exists (used by '{}')",
                prefix, owner.name
            )));
        }

        let port = if new.kind.is_server_side() {
            let used = self.store.used_ports().await?;
            Some(self.allocator.allocate(&used)?)
        } else {
            None
        };

        let project = self
            .store
            .insert(Project::from_new(new.with_hostname_prefix(prefix), port))
            .await?;
        info!(id = %project.id, kind = %project.kind, port = ?project.port, "Project created");
        Ok(project)
    }

    pub async fn get(&self, id: ProjectId) -> DeployResult<Project> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DeployError::NotFound(id.to_string()))
    }

    pub async fn get_by_name(&self, name: &str) -> DeployResult<Project> {
        self.store
            .get_by_name(name)
            .await?
            .ok_or_else(|| DeployError::NotFound(name.to_string()))
    }

    pub async fn list(&self) -> DeployResult<Vec<Project>> {
        Ok(self.store.list().await?)
    }

    /// Edits metadata only; takes effect on the next deploy
    pub async fn update(&self, id: ProjectId, update: ProjectUpdate) -> DeployResult<Project> {
        let lock = self.project_lock(id);
        let _guard = lock.lock().await;

        let mut project = self.get(id).await?;
        if update.is_empty() {
            return Ok(project);
        }
        update.apply(&mut project);
        self.store.update(&project).await?;
        Ok(project)
    }

    /// Fetches the source and brings the project up, ending in RUNNING or FAILED.
    ///
    /// Steps that completed before a failure are not undone; deploying again is the recovery
    /// path.
    #[instrument(skip(self))]
    pub async fn deploy(&self, id: ProjectId) -> DeployResult<Project> {
        let lock = self.project_lock(id);
        let _guard = lock.lock().await;

        let mut project = self.get(id).await?;
        state::begin_build(&mut project)?;
        self.store.update(&project).await?;

        let started = Instant::now();
        self.emit(DeployEvent::Started {
            project: project.name.clone(),
        });

        match self.run_pipeline(&mut project).await {
            Ok(handle) => {
                let mut finished = project.clone();
                state::finish_running(&mut finished, handle)?;
                if let Err(store_err) = self.store.update(&finished).await {
                    return Err(self.fail_deploy(&mut project, None, store_err.into()).await);
                }
                self.emit(DeployEvent::Completed {
                    project: finished.name.clone(),
                    total_time: started.elapsed(),
                });
                Ok(finished)
            }
            Err(StepFailure { step, error }) => {
                Err(self.fail_deploy(&mut project, Some(step), error).await)
            }
        }
    }

    /// BUILDING → FAILED, persisted best-effort; hands the error back for the caller
    async fn fail_deploy(
        &self,
        project: &mut Project,
        step: Option<DeployStep>,
        err: DeployError,
    ) -> DeployError {
        if let Err(transition) = state::fail(project, err.to_string()) {
            error!(project = %project.name, error = %transition, "Deploy failed outside BUILDING");
        }
        if let Err(store_err) = self.store.update(project).await {
            error!(project = %project.name, error = %store_err, "Failed to persist deploy failure");
        }
        self.emit(DeployEvent::Failed {
            project: project.name.clone(),
            step,
            error: err.to_string(),
        });
        err
    }

    async fn run_pipeline(
        &self,
        project: &mut Project,
    ) -> Result<Option<InstanceHandle>, StepFailure> {
        let timeouts = self.settings.timeouts;
        let workdir = self.workdir(project);
        let name = project.name.clone();

        self.run_step(
            &name,
            DeployStep::FetchSource,
            Some(timeouts.fetch),
            async {
                self.acquirer
                    .acquire(&workdir, &project.source)
                    .await
                    .map_err(DeployError::from)
            },
        )
        .await?;

        if !project.is_server_side() {
            let prefix = project.hostname_prefix.clone();
            self.run_step(&name, DeployStep::ConfigureRouting, None, async {
                let root = tokio::fs::canonicalize(&workdir).await?;
                self.router.publish_static(&prefix, &root).await?;
                Ok::<(), DeployError>(())
            })
            .await?;
            return Ok(None);
        }

        let recipe = self
            .run_step(&name, DeployStep::PrepareRecipe, None, async {
                self.prepare_recipe(&workdir, project.launch_command.as_deref())
                    .await
            })
            .await?;
        project.recipe_path = Some(recipe.clone());
        project.touch();
        self.store
            .update(project)
            .await
            .map_err(|e| StepFailure {
                step: DeployStep::PrepareRecipe,
                error: e.into(),
            })?;

        let port = project.port.ok_or_else(|| StepFailure {
            step: DeployStep::StartInstance,
            error: DeployError::validation("Server-side project has no port assigned"),
        })?;
        let image_tag = project.image_tag();
        let instance_name = project.instance_name();

        self.run_step(&name, DeployStep::BuildImage, Some(timeouts.build), async {
            self.runtime
                .build(&recipe, &image_tag, &workdir)
                .await
                .map_err(DeployError::from)
        })
        .await?;

        let handle = self
            .run_step(&name, DeployStep::StartInstance, Some(timeouts.start), async {
                self.runtime
                    .start(&image_tag, &instance_name, port)
                    .await
                    .map_err(DeployError::from)
            })
            .await?;

        self.run_step(&name, DeployStep::ConfigureRouting, None, async {
            self.router
                .publish_proxy(&project.hostname_prefix, port)
                .await?;
            Ok::<(), DeployError>(())
        })
        .await?;

        Ok(Some(handle))
    }

    /// The project's own Dockerfile if it has one, else a generated recipe
    async fn prepare_recipe(
        &self,
        workdir: &Path,
        launch_command: Option<&str>,
    ) -> DeployResult<PathBuf> {
        if let Some(path) = RecipeSynthesizer::locate_user_recipe(workdir) {
            info!(path = %path.display(), "Using project Dockerfile");
            return Ok(path);
        }
        Ok(self.synthesizer.synthesize(workdir, launch_command).await?)
    }

    async fn run_step<T, F>(
        &self,
        project: &str,
        step: DeployStep,
        limit: Option<Duration>,
        fut: F,
    ) -> Result<T, StepFailure>
    where
        F: Future<Output = DeployResult<T>>,
    {
        self.emit(DeployEvent::StepStarted {
            project: project.to_string(),
            step,
        });
        let started = Instant::now();

        let result = match limit {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(DeployError::Timeout {
                    step: step.as_str(),
                    limit,
                }),
            },
            None => fut.await,
        };

        match result {
            Ok(value) => {
                self.emit(DeployEvent::StepComplete {
                    project: project.to_string(),
                    step,
                    duration: started.elapsed(),
                });
                Ok(value)
            }
            Err(error) => Err(StepFailure { step, error }),
        }
    }

    /// Brings a stopped project back without rebuilding
    #[instrument(skip(self))]
    pub async fn start(&self, id: ProjectId) -> DeployResult<Project> {
        let lock = self.project_lock(id);
        let _guard = lock.lock().await;

        let mut project = self.get(id).await?;
        match project.status {
            ProjectStatus::Running => return Ok(project),
            ProjectStatus::Building => {
                return Err(DeployError::InvalidTransition {
                    from: project.status,
                    action: "start",
                })
            }
            ProjectStatus::Stopped | ProjectStatus::Failed => {}
        }

        if project.is_server_side() {
            if let Err(err) = self.resume_instance(&project).await {
                state::record_error(&mut project, err.to_string());
                self.store.update(&project).await?;
                warn!(project = %project.name, error = %err, "Start failed");
                return Err(err);
            }
        }

        state::mark_running(&mut project)?;
        self.store.update(&project).await?;
        info!(project = %project.name, "Project started");
        Ok(project)
    }

    async fn resume_instance(&self, project: &Project) -> DeployResult<()> {
        if project.runtime_handle.is_none() {
            return Err(DeployError::InvalidTransition {
                from: project.status,
                action: "start never-deployed",
            });
        }
        for target in instance_targets(project) {
            if self.runtime.resume(&target).await? {
                return Ok(());
            }
        }
        Err(DeployError::Provision(
            "instance no longer exists; redeploy the project".to_string(),
        ))
    }

    /// Stops the instance best-effort; the project always ends STOPPED
    #[instrument(skip(self))]
    pub async fn stop(&self, id: ProjectId) -> DeployResult<Project> {
        let lock = self.project_lock(id);
        let _guard = lock.lock().await;

        let mut project = self.get(id).await?;
        if project.status == ProjectStatus::Stopped {
            return Ok(project);
        }

        if project.is_server_side() {
            let mut stopped = false;
            for target in instance_targets(&project) {
                match self.runtime.stop(&target).await {
                    Ok(true) => {
                        stopped = true;
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(project = %project.name, instance = %target, error = %e, "Failed to stop instance");
                        break;
                    }
                }
            }
            if !stopped {
                warn!(project = %project.name, "No running instance was stopped");
            }
        }

        state::mark_stopped(&mut project)?;
        self.store.update(&project).await?;
        info!(project = %project.name, "Project stopped");
        Ok(project)
    }

    /// Removes everything the project owns, then the record.
    ///
    /// Cleanup steps run independently and never abort the delete; their outcomes are
    /// returned in the report.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProjectId) -> DeployResult<CleanupReport> {
        let lock = self.project_lock(id);
        let _guard = lock.lock().await;

        let project = self.get(id).await?;

        let instance = if project.is_server_side() {
            self.remove_instance(&project).await
        } else {
            StepOutcome::Skipped
        };
        let routing = self.router.unpublish(&project.hostname_prefix).await.into();
        let workdir = remove_workdir(&self.workdir(&project)).await;

        let report = CleanupReport {
            instance,
            routing,
            workdir,
        };
        for (step, failure) in report.failures() {
            warn!(project = %project.name, step, error = failure, "Cleanup step failed");
        }

        self.store.delete(id).await?;
        self.project_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        info!(project = %project.name, clean = report.is_clean(), "Project deleted");
        Ok(report)
    }

    /// Removes by handle, then by instance name to catch an instance the handle no longer
    /// points at
    async fn remove_instance(&self, project: &Project) -> StepOutcome {
        let mut outcome = StepOutcome::AlreadyAbsent;
        for target in instance_targets(project) {
            match self.runtime.remove(&target).await {
                Ok(Removal::Removed) => outcome = StepOutcome::Done,
                Ok(Removal::AlreadyAbsent) => {}
                Err(e) => return StepOutcome::Failed(e.to_string()),
            }
        }
        outcome
    }

    /// Container logs, `None` for static projects or when no instance exists
    pub async fn logs(&self, id: ProjectId, tail: usize) -> DeployResult<Option<String>> {
        let project = self.get(id).await?;
        if !project.is_server_side() {
            return Ok(None);
        }
        for target in instance_targets(&project) {
            if let Some(logs) = self.runtime.logs(&target, tail).await? {
                return Ok(Some(logs));
            }
        }
        Ok(None)
    }

    /// Runtime-reported container state, `None` for static projects or when no instance exists
    pub async fn runtime_status(&self, id: ProjectId) -> DeployResult<Option<String>> {
        let project = self.get(id).await?;
        if !project.is_server_side() {
            return Ok(None);
        }
        for target in instance_targets(&project) {
            if let Some(status) = self.runtime.status(&target).await? {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    fn project_lock(&self, id: ProjectId) -> Arc<tokio::sync::Mutex<()>> {
        self.project_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_default()
            .clone()
    }

    fn emit(&self, event: DeployEvent) {
        self.progress.on_progress(&event);
    }
}

/// Stored handle first, then the stable instance name
fn instance_targets(project: &Project) -> Vec<InstanceHandle> {
    let by_name = InstanceHandle(project.instance_name());
    match &project.runtime_handle {
        Some(handle) if *handle != by_name => vec![handle.clone(), by_name],
        _ => vec![by_name],
    }
}

async fn remove_workdir(path: &Path) -> StepOutcome {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => StepOutcome::Done,
        Err(e) if e.kind() == io::ErrorKind::NotFound => StepOutcome::AlreadyAbsent,
        Err(e) => StepOutcome::Failed(e.to_string()),
    }
}
