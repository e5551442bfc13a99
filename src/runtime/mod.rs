//! Container runtime for server-side projects

mod docker;

pub use docker::DockerProvisioner;

use crate::cleanup::Removal;
use crate::project::InstanceHandle;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Image build failed; carries the build tool's diagnostics
    #[error("{0}")]
    Build(String),

    #[error("{0}")]
    Provision(String),

    #[error("Docker daemon unavailable: {0}")]
    Unavailable(String),

    #[error("Docker API error: {0}")]
    Api(#[from] bollard::errors::Error),
}

/// Builds images and manages the lifecycle of one container per project.
///
/// Handles are opaque to callers. The Docker implementation also accepts a container name
/// wherever a handle is expected.
#[async_trait]
pub trait RuntimeProvisioner: Send + Sync {
    /// Builds `image_tag` from `recipe` with `context_dir` as build context
    async fn build(
        &self,
        recipe: &Path,
        image_tag: &str,
        context_dir: &Path,
    ) -> Result<(), RuntimeError>;

    /// Starts a detached instance named `instance_name`, replacing any existing one with that
    /// name, with the internal port bound to `external_port`
    async fn start(
        &self,
        image_tag: &str,
        instance_name: &str,
        external_port: u16,
    ) -> Result<InstanceHandle, RuntimeError>;

    /// Restarts an existing, stopped instance. `Ok(false)` if the instance is gone.
    async fn resume(&self, handle: &InstanceHandle) -> Result<bool, RuntimeError>;

    /// `Ok(false)` if the instance is gone
    async fn stop(&self, handle: &InstanceHandle) -> Result<bool, RuntimeError>;

    async fn remove(&self, handle: &InstanceHandle) -> Result<Removal, RuntimeError>;

    /// Runtime-reported state (`running`, `exited`, ...), `None` if the instance is gone
    async fn status(&self, handle: &InstanceHandle) -> Result<Option<String>, RuntimeError>;

    /// Last `tail` lines of combined stdout/stderr, `None` if the instance is gone
    async fn logs(
        &self,
        handle: &InstanceHandle,
        tail: usize,
    ) -> Result<Option<String>, RuntimeError>;
}
