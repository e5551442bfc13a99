//! In-memory project store for tests and embedding.

use super::{ProjectStore, ProjectTable, StoreError, StoreResult};
use crate::project::{Project, ProjectId};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Records are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<ProjectTable>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, ProjectTable>> {
        self.table
            .read()
            .map_err(|_| StoreError::internal("lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, ProjectTable>> {
        self.table
            .write()
            .map_err(|_| StoreError::internal("lock poisoned"))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn insert(&self, project: Project) -> StoreResult<Project> {
        self.write()?.insert(project)
    }

    async fn get(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        Ok(self.read()?.get_by_name(name).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<Project>> {
        Ok(self.read()?.list())
    }

    async fn update(&self, project: &Project) -> StoreResult<()> {
        self.write()?.update(project)
    }

    async fn delete(&self, id: ProjectId) -> StoreResult<()> {
        self.write()?.delete(id)
    }

    async fn used_ports(&self) -> StoreResult<HashSet<u16>> {
        Ok(self.read()?.used_ports())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{NewProject, ProjectKind, ProjectStatus, SourceOrigin};

    fn new_static(name: &str) -> Project {
        Project::from_new(
            NewProject::new(name, ProjectKind::Static, SourceOrigin::Local("/srv/site".into())),
            None,
        )
    }

    #[tokio::test]
    async fn test_insert_get_update() {
        let store = MemoryStore::new();
        let mut project = store.insert(new_static("site")).await.unwrap();

        project.status = ProjectStatus::Running;
        store.update(&project).await.unwrap();

        let loaded = store.get(project.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ProjectStatus::Running);
        assert_eq!(
            store.get_by_name("site").await.unwrap().map(|p| p.id),
            Some(project.id)
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let project = store.insert(new_static("site")).await.unwrap();
        store.delete(project.id).await.unwrap();
        assert!(store.get(project.id).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }
}
