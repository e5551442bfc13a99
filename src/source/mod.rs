//! Source acquisition into a project's working directory
//!
//! The new tree is always assembled in a sibling staging directory. Only a complete tree is
//! swapped into place, so a failed or interrupted acquisition leaves the previous working
//! directory untouched.

mod git;
mod local;

use crate::project::SourceOrigin;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    Fetch(String),

    #[error("I/O error while preparing source: {0}")]
    Io(#[from] io::Error),
}

/// Materializes [`SourceOrigin`]s on disk
#[derive(Debug, Clone)]
pub struct SourceAcquirer {
    git_bin: String,
}

impl SourceAcquirer {
    pub fn new() -> Self {
        Self {
            git_bin: "git".to_string(),
        }
    }

    pub fn with_git_binary(mut self, git_bin: impl Into<String>) -> Self {
        self.git_bin = git_bin.into();
        self
    }

    /// Replaces `destination` with a fresh copy of `origin`.
    ///
    /// Safe to call repeatedly; each call yields a clean tree with nothing left over from
    /// earlier runs.
    #[instrument(skip_all, fields(destination = %destination.display(), origin = %origin))]
    pub async fn acquire(&self, destination: &Path, origin: &SourceOrigin) -> Result<(), SourceError> {
        let parent = destination.parent().ok_or_else(|| {
            SourceError::Fetch(format!(
                "working directory {} has no parent",
                destination.display()
            ))
        })?;
        tokio::fs::create_dir_all(parent).await?;

        let staging = StagingDir::create(destination).await?;
        debug!(staging = %staging.path().display(), "Created staging directory");

        match origin {
            SourceOrigin::Local(path) => local::copy_into(path, staging.path()).await?,
            SourceOrigin::Git(url) => git::clone_into(&self.git_bin, url, staging.path()).await?,
        }

        swap_into_place(staging, destination).await?;
        info!("Source ready");
        Ok(())
    }
}

impl Default for SourceAcquirer {
    fn default() -> Self {
        Self::new()
    }
}

fn sibling(destination: &Path, tag: &str) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string());
    destination.with_file_name(format!(".{}.{}-{}", name, tag, Uuid::new_v4().simple()))
}

/// Staging directory removed on drop unless committed
struct StagingDir {
    path: PathBuf,
    committed: bool,
}

impl StagingDir {
    async fn create(destination: &Path) -> io::Result<Self> {
        let path = sibling(destination, "staging");
        tokio::fs::create_dir(&path).await?;
        Ok(Self {
            path,
            committed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to remove staging directory");
                }
            }
        }
    }
}

async fn swap_into_place(staging: StagingDir, destination: &Path) -> Result<(), SourceError> {
    let previous = match tokio::fs::symlink_metadata(destination).await {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    let retired = sibling(destination, "retired");
    if previous.is_some() {
        tokio::fs::rename(destination, &retired).await?;
    }

    if let Err(e) = tokio::fs::rename(staging.path(), destination).await {
        if previous.is_some() {
            if let Err(restore) = tokio::fs::rename(&retired, destination).await {
                warn!(error = %restore, "Failed to restore previous working directory");
            }
        }
        return Err(e.into());
    }
    staging.commit();

    if let Some(meta) = previous {
        let removed = if meta.is_dir() {
            tokio::fs::remove_dir_all(&retired).await
        } else {
            tokio::fs::remove_file(&retired).await
        };
        if let Err(e) = removed {
            warn!(path = %retired.display(), error = %e, "Failed to remove previous working directory");
        }
    }
    Ok(())
}
