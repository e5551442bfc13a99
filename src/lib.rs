//! launchpad - single-host deployment orchestrator
//!
//! Keeps a registry of projects and turns each one into a public endpoint at
//! `<prefix>.<domain>`. Static projects are served by nginx straight from their working
//! directory. Server-side projects are built into a Docker image, started as a container on an
//! allocated host port and reverse-proxied by nginx.
//!
//! # Example Usage
//!
//! ```ignore
//! use launchpad::{Orchestrator, OrchestratorSettings, NewProject, ProjectKind, SourceOrigin};
//! use launchpad::routing::NginxRouter;
//! use launchpad::runtime::DockerProvisioner;
//! use launchpad::store::MemoryStore;
//! use std::sync::Arc;
//!
//! async fn run() -> launchpad::DeployResult<()> {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(DockerProvisioner::connect()?),
//!         Arc::new(NginxRouter::new("/etc/nginx/conf.d", "launch.me")),
//!         OrchestratorSettings::new("/var/lib/launchpad/projects"),
//!     );
//!
//!     let project = orchestrator
//!         .create(NewProject::new(
//!             "api",
//!             ProjectKind::ServerSide,
//!             SourceOrigin::Git("https://github.com/acme/api.git".to_string()),
//!         ))
//!         .await?;
//!     let project = orchestrator.deploy(project.id).await?;
//!     println!("{} is {}", project.hostname("launch.me"), project.status);
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`deploy`]: the orchestrator and the lifecycle state machine
//! - [`source`]: local copy and git clone into a working directory
//! - [`recipe`]: stack detection and Dockerfile synthesis
//! - [`runtime`]: image build and container lifecycle
//! - [`routing`]: nginx unit files and reloads
//! - [`store`]: in-memory and JSON-file project stores

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod ports;
pub mod progress;
pub mod project;
pub mod recipe;
pub mod routing;
pub mod runtime;
pub mod source;
pub mod store;
pub mod util;

pub use cleanup::{CleanupReport, StepOutcome};
pub use config::{ConfigError, LaunchpadConfig};
pub use deploy::{DeployTimeouts, Orchestrator, OrchestratorSettings};
pub use error::{DeployError, DeployResult};
pub use project::{
    InstanceHandle, NewProject, Project, ProjectId, ProjectKind, ProjectStatus, ProjectUpdate,
    SourceOrigin,
};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
