use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Prefix shared by image tags and container names
const RUNTIME_NAME_PREFIX: &str = "launchpad";

/// Store-assigned project identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of workload a project is. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    /// Files served directly by the proxy
    Static,
    /// A container built from the source and reverse-proxied
    ServerSide,
}

impl ProjectKind {
    pub fn is_server_side(&self) -> bool {
        matches!(self, ProjectKind::ServerSide)
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectKind::Static => write!(f, "static"),
            ProjectKind::ServerSide => write!(f, "server-side"),
        }
    }
}

/// Where a project's source tree comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "lowercase")]
pub enum SourceOrigin {
    /// A directory or single file on this host
    Local(PathBuf),
    /// A repository URL handed to `git clone`
    Git(String),
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceOrigin::Local(path) => write!(f, "local:{}", path.display()),
            SourceOrigin::Git(url) => write!(f, "git:{}", url),
        }
    }
}

/// Lifecycle status of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    Stopped,
    Building,
    Running,
    Failed,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectStatus::Stopped => "STOPPED",
            ProjectStatus::Building => "BUILDING",
            ProjectStatus::Running => "RUNNING",
            ProjectStatus::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Opaque identifier of a container, as returned by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceHandle(pub String);

impl InstanceHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deployable project record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub kind: ProjectKind,
    pub source: SourceOrigin,
    pub hostname_prefix: String,
    /// Host port for server-side projects; always `None` for static ones
    pub port: Option<u16>,
    pub runtime_handle: Option<InstanceHandle>,
    pub launch_command: Option<String>,
    pub recipe_path: Option<PathBuf>,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Builds a fresh `STOPPED` record. The store assigns the real id on insert.
    pub fn from_new(new: NewProject, port: Option<u16>) -> Self {
        let now = Utc::now();
        let hostname_prefix = new.hostname_prefix.unwrap_or_else(|| new.name.clone());
        Self {
            id: ProjectId(0),
            name: new.name,
            kind: new.kind,
            source: new.source,
            hostname_prefix,
            port,
            runtime_handle: None,
            launch_command: new.launch_command,
            recipe_path: None,
            description: new.description,
            status: ProjectStatus::Stopped,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_server_side(&self) -> bool {
        self.kind.is_server_side()
    }

    /// Image tag the runtime builds for this project
    pub fn image_tag(&self) -> String {
        format!("{}-{}:latest", RUNTIME_NAME_PREFIX, self.name)
    }

    /// Stable container name; a redeploy replaces the container with this name
    pub fn instance_name(&self) -> String {
        format!("{}-{}", RUNTIME_NAME_PREFIX, self.name)
    }

    /// Public hostname under the given domain
    pub fn hostname(&self, domain: &str) -> String {
        format!("{}.{}", self.hostname_prefix, domain)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Input for creating a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub name: String,
    pub kind: ProjectKind,
    pub source: SourceOrigin,
    /// Defaults to `name` when unset
    pub hostname_prefix: Option<String>,
    pub launch_command: Option<String>,
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, kind: ProjectKind, source: SourceOrigin) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            hostname_prefix: None,
            launch_command: None,
            description: None,
        }
    }

    pub fn with_launch_command(mut self, command: impl Into<String>) -> Self {
        self.launch_command = Some(command.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hostname_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hostname_prefix = Some(prefix.into());
        self
    }
}

/// Metadata edit. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub description: Option<String>,
    pub launch_command: Option<String>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.launch_command.is_none()
    }

    pub fn apply(self, project: &mut Project) {
        if let Some(description) = self.description {
            project.description = Some(description);
        }
        if let Some(command) = self.launch_command {
            project.launch_command = Some(command);
        }
        project.touch();
    }
}
