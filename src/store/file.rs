//! JSON file backed project store.

use super::{ProjectStore, ProjectTable, StoreResult};
use crate::project::{Project, ProjectId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Keeps the whole table in memory and rewrites the file after every mutation.
///
/// Writes go to a sibling temp file that is renamed over the state file, so a crash mid-write
/// leaves the previous document intact. A mutation that fails to persist is not applied in
/// memory either.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    table: RwLock<ProjectTable>,
}

impl JsonFileStore {
    /// Loads `path`, or starts empty if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let table = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "State file not found, starting empty");
                ProjectTable::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &ProjectTable) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "projects.json".to_string());
        let temp = self.path.with_file_name(format!(".{}.tmp", file_name));

        let bytes = serde_json::to_vec_pretty(table)?;
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), "Persisted state file");
        Ok(())
    }

    /// Applies `op` to a copy of the table, persists the copy, then swaps it in.
    async fn mutate<T>(
        &self,
        op: impl FnOnce(&mut ProjectTable) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let mut table = self.table.write().await;
        let mut next = table.clone();
        let result = op(&mut next)?;
        self.persist(&next).await?;
        *table = next;
        Ok(result)
    }
}

#[async_trait]
impl ProjectStore for JsonFileStore {
    async fn insert(&self, project: Project) -> StoreResult<Project> {
        self.mutate(|table| table.insert(project)).await
    }

    async fn get(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.table.read().await.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        Ok(self.table.read().await.get_by_name(name).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        Ok(self.table.read().await.list())
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        self.mutate(|table| table.update(project)).await
    }

    async fn delete(&self, id: ProjectId) -> StoreResult<()> {
        self.mutate(|table| table.delete(id)).await
    }

    async fn used_ports(&self) -> StoreResult<HashSet<u16>> {
        Ok(self.table.read().await.used_ports())
    }
}
