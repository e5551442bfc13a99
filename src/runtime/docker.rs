use super::{RuntimeError, RuntimeProvisioner};
use crate::cleanup::Removal;
use crate::project::InstanceHandle;
use crate::recipe::INTERNAL_PORT;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::models::{HostConfig, PortBinding, RestartPolicy, RestartPolicyNameEnum};
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

const DEFAULT_DOCKER_BIN: &str = "docker";

/// Seconds Docker waits before killing a stopping container
const STOP_GRACE_SECS: i64 = 10;

/// Docker-backed runtime.
///
/// Image builds shell out to the `docker` CLI so the recipe is built exactly as an operator
/// would build it by hand. Container lifecycle goes through the Engine API.
pub struct DockerProvisioner {
    docker: Docker,
    docker_bin: String,
}

impl DockerProvisioner {
    pub fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Unavailable(e.to_string()))?;
        Ok(Self {
            docker,
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
        })
    }

    pub fn with_docker_binary(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    async fn remove_by_name(&self, target: &str) -> Result<Removal, RuntimeError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        match self.docker.remove_container(target, Some(options)).await {
            Ok(()) => Ok(Removal::Removed),
            Err(e) if has_status(&e, 404) => Ok(Removal::AlreadyAbsent),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl RuntimeProvisioner for DockerProvisioner {
    async fn build(
        &self,
        recipe: &Path,
        image_tag: &str,
        context_dir: &Path,
    ) -> Result<(), RuntimeError> {
        docker_build(&self.docker_bin, recipe, image_tag, context_dir).await
    }

    #[instrument(skip(self))]
    async fn start(
        &self,
        image_tag: &str,
        instance_name: &str,
        external_port: u16,
    ) -> Result<InstanceHandle, RuntimeError> {
        if self.remove_by_name(instance_name).await? == Removal::Removed {
            info!("Removed previous instance");
        }

        let port_key = format!("{}/tcp", INTERNAL_PORT);
        let config = Config {
            image: Some(image_tag.to_string()),
            exposed_ports: Some([(port_key.clone(), HashMap::new())].into_iter().collect()),
            host_config: Some(HostConfig {
                port_bindings: Some(
                    [(
                        port_key,
                        Some(vec![PortBinding {
                            host_ip: None,
                            host_port: Some(external_port.to_string()),
                        }]),
                    )]
                    .into_iter()
                    .collect(),
                ),
                restart_policy: Some(RestartPolicy {
                    name: Some(RestartPolicyNameEnum::UNLESS_STOPPED),
                    maximum_retry_count: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let options = CreateContainerOptions {
            name: instance_name.to_string(),
            platform: None,
        };

        let created = self
            .docker
            .create_container(Some(options), config)
            .await
            .map_err(|e| RuntimeError::Provision(format!("Failed to create container: {}", e)))?;

        if let Err(e) = self
            .docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await
        {
            if let Err(cleanup) = self.remove_by_name(&created.id).await {
                warn!(error = %cleanup, "Failed to remove container that did not start");
            }
            return Err(RuntimeError::Provision(format!(
                "Failed to start container: {}",
                e
            )));
        }

        info!(container = %created.id, "Container started");
        Ok(InstanceHandle(created.id))
    }

    #[instrument(skip_all, fields(handle = %handle))]
    async fn resume(&self, handle: &InstanceHandle) -> Result<bool, RuntimeError> {
        match self
            .docker
            .start_container(handle.as_str(), None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(true),
            // 304: already running
            Err(e) if has_status(&e, 304) => Ok(true),
            Err(e) if has_status(&e, 404) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(handle = %handle))]
    async fn stop(&self, handle: &InstanceHandle) -> Result<bool, RuntimeError> {
        let options = StopContainerOptions { t: STOP_GRACE_SECS };
        match self.docker.stop_container(handle.as_str(), Some(options)).await {
            Ok(()) => Ok(true),
            Err(e) if has_status(&e, 304) => Ok(true),
            Err(e) if has_status(&e, 404) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(handle = %handle))]
    async fn remove(&self, handle: &InstanceHandle) -> Result<Removal, RuntimeError> {
        self.remove_by_name(handle.as_str()).await
    }

    async fn status(&self, handle: &InstanceHandle) -> Result<Option<String>, RuntimeError> {
        match self.docker.inspect_container(handle.as_str(), None).await {
            Ok(inspect) => Ok(Some(
                inspect
                    .state
                    .and_then(|s| s.status)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            )),
            Err(e) if has_status(&e, 404) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn logs(
        &self,
        handle: &InstanceHandle,
        tail: usize,
    ) -> Result<Option<String>, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = self.docker.logs(handle.as_str(), Some(options));
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(log) => output.push_str(&log.to_string()),
                Err(e) if has_status(&e, 404) => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(output))
    }
}

/// Runs `docker build -f <recipe> -t <tag> <context>`
#[instrument(skip_all, fields(image = %image_tag, recipe = %recipe.display()))]
async fn docker_build(
    docker_bin: &str,
    recipe: &Path,
    image_tag: &str,
    context_dir: &Path,
) -> Result<(), RuntimeError> {
    info!("Building image");
    let output = Command::new(docker_bin)
        .arg("build")
        .arg("-f")
        .arg(recipe)
        .arg("-t")
        .arg(image_tag)
        .arg(context_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RuntimeError::Build(format!("Failed to run {}: {}", docker_bin, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(RuntimeError::Build(format!(
            "docker build exited with {}: {}",
            output.status, diagnostics
        )));
    }

    debug!(bytes = output.stdout.len(), "docker build finished");
    Ok(())
}

fn has_status(err: &bollard::errors::Error, code: u16) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError { status_code, .. } if *status_code == code
    )
}
