//! Deployment error taxonomy
//!
//! Component errors (`SourceError`, `RuntimeError`, `RoutingError`, ...) convert into
//! [`DeployError`], which is what the orchestrator records on a project and returns to callers.

use crate::ports::PortError;
use crate::project::{ProjectStatus, ValidationError};
use crate::routing::RoutingError;
use crate::runtime::RuntimeError;
use crate::source::SourceError;
use crate::store::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`DeployError`].
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors surfaced by orchestrator operations
#[derive(Debug, Error)]
pub enum DeployError {
    /// Bad input rejected before any side effect (name charset, duplicate name, empty source)
    #[error("{0}")]
    Validation(String),

    /// Local source path does not exist
    #[error("Source path does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Clone or copy of the source failed
    #[error("Failed to fetch source: {0}")]
    SourceFetch(String),

    /// Image build failed
    #[error("Failed to build image: {0}")]
    Build(String),

    /// Container start (or another runtime call) failed
    #[error("Failed to provision instance: {0}")]
    Provision(String),

    /// Routing unit was rejected by the proxy or the reload failed
    #[error("Failed to configure routing: {0}")]
    Routing(String),

    /// No free port left in the configured range
    #[error("No available ports in range {start}-{end}")]
    ResourceExhausted { start: u16, end: u16 },

    /// Operation addressed an unknown project
    #[error("Project not found: {0}")]
    NotFound(String),

    /// The requested transition is not legal from the current status
    #[error("Cannot {action} project in status {from}")]
    InvalidTransition {
        from: ProjectStatus,
        action: &'static str,
    },

    /// An external step exceeded its time limit
    #[error("{step} timed out after {}", format_limit(.limit))]
    Timeout {
        step: &'static str,
        limit: Duration,
    },

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Local filesystem failure outside a specific component
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeployError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Returns the message with a troubleshooting hint for the common failure modes
    pub fn help_message(&self) -> String {
        match self {
            DeployError::Provision(msg) | DeployError::Build(msg)
                if msg.contains("docker") || msg.contains("Docker") =>
            {
                format!(
                    "Error: {}\n\n\
                    Help: The container runtime could not be reached. Check:\n\
                    - Is the Docker daemon running?\n\
                    - Can this user access /var/run/docker.sock?",
                    self
                )
            }
            DeployError::Routing(msg) if msg.starts_with(REJECTED_MESSAGE_PREFIX) => {
                format!(
                    "Error: {}\n\n\
                    Help: nginx rejected the generated configuration. The previous unit was\n\
                    restored; run `nginx -t` to inspect the full configuration set.",
                    self
                )
            }
            DeployError::Routing(_) => {
                format!(
                    "Error: {}\n\n\
                    Help: The unit file was changed but nginx did not reload it. Check that\n\
                    nginx is running and that this user may signal it, then run\n\
                    `nginx -s reload`.",
                    self
                )
            }
            DeployError::Validation(msg) if msg.contains("already exists") => {
                format!(
                    "Error: {}\n\n\
                    Help: Project names and hostnames are unique. Pick another name or\n\
                    delete the existing project first.",
                    self
                )
            }
            DeployError::ResourceExhausted { .. } => {
                format!(
                    "Error: {}\n\n\
                    Help: Widen LAUNCHPAD_PORT_RANGE_START/LAUNCHPAD_PORT_RANGE_END or delete\n\
                    unused server-side projects.",
                    self
                )
            }
            _ => format!("Error: {}", self),
        }
    }
}

/// Leading text of `RoutingError::Rejected` messages
const REJECTED_MESSAGE_PREFIX: &str = "nginx rejected";

/// Whole seconds as `30s`, anything finer as `250ms`
fn format_limit(limit: &Duration) -> String {
    if limit.subsec_nanos() == 0 {
        format!("{}s", limit.as_secs())
    } else {
        format!("{}ms", limit.as_millis())
    }
}

impl From<ValidationError> for DeployError {
    fn from(err: ValidationError) -> Self {
        DeployError::Validation(err.to_string())
    }
}

impl From<PortError> for DeployError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Exhausted { start, end } => DeployError::ResourceExhausted { start, end },
        }
    }
}

impl From<SourceError> for DeployError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => DeployError::SourceNotFound(path),
            other => DeployError::SourceFetch(other.to_string()),
        }
    }
}

impl From<RuntimeError> for DeployError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Build(msg) => DeployError::Build(msg),
            other => DeployError::Provision(other.to_string()),
        }
    }
}

impl From<RoutingError> for DeployError {
    fn from(err: RoutingError) -> Self {
        DeployError::Routing(err.to_string())
    }
}

impl From<StoreError> for DeployError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => DeployError::NotFound(id.to_string()),
            StoreError::Conflict(msg) => DeployError::Validation(msg),
            other => DeployError::Store(other),
        }
    }
}
