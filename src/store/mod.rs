//! Project record persistence
//!
//! Both backends share [`ProjectTable`], which owns id assignment and the uniqueness rules, so
//! they cannot drift apart on semantics.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::project::{Project, ProjectId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project {0} not found")]
    NotFound(ProjectId),

    /// A unique field (name or hostname prefix) is already taken
    #[error("{0}")]
    Conflict(String),

    #[error("State file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store internal error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Stores a new record and returns it with its assigned id
    async fn insert(&self, project: Project) -> StoreResult<Project>;

    async fn get(&self, id: ProjectId) -> StoreResult<Option<Project>>;

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Project>>;

    /// All records, newest first
    async fn list(&self) -> StoreResult<Vec<Project>>;

    /// Replaces the stored record with the same id
    async fn update(&self, project: &Project) -> StoreResult<()>;

    async fn delete(&self, id: ProjectId) -> StoreResult<()>;

    /// Ports held by any record, whatever its status
    async fn used_ports(&self) -> StoreResult<HashSet<u16>>;
}

/// The full set of records plus the id counter. Also the on-disk document of [`JsonFileStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectTable {
    next_id: u64,
    projects: Vec<Project>,
}

impl Default for ProjectTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            projects: Vec::new(),
        }
    }
}

impl ProjectTable {
    pub fn insert(&mut self, mut project: Project) -> StoreResult<Project> {
        if self.projects.iter().any(|p| p.name == project.name) {
            return Err(StoreError::Conflict(format!(
                "Project '{}' already exists",
                project.name
            )));
        }
        if let Some(owner) = self
            .projects
            .iter()
            .find(|p| p.hostname_prefix == project.hostname_prefix)
        {
            return Err(StoreError::Conflict(format!(
                "Hostname prefix '{}' already exists (used by '{}')",
                project.hostname_prefix, owner.name
            )));
        }

        project.id = ProjectId(self.next_id);
        self.next_id += 1;
        self.projects.push(project.clone());
        Ok(project)
    }

    pub fn get(&self, id: ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn list(&self) -> Vec<Project> {
        let mut projects = self.projects.clone();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        projects
    }

    pub fn update(&mut self, project: &Project) -> StoreResult<()> {
        let slot = self
            .projects
            .iter_mut()
            .find(|p| p.id == project.id)
            .ok_or(StoreError::NotFound(project.id))?;
        *slot = project.clone();
        Ok(())
    }

    pub fn delete(&mut self, id: ProjectId) -> StoreResult<()> {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != id);
        if self.projects.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    pub fn used_ports(&self) -> HashSet<u16> {
        self.projects.iter().filter_map(|p| p.port).collect()
    }
}
