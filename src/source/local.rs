use super::SourceError;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Copies a local directory's contents, or a single file, into `target`.
pub(super) async fn copy_into(source: &Path, target: &Path) -> Result<(), SourceError> {
    let meta = match tokio::fs::metadata(source).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SourceError::NotFound(source.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        let canonical_source = tokio::fs::canonicalize(source).await?;
        let canonical_target = tokio::fs::canonicalize(target).await?;
        if canonical_target.starts_with(&canonical_source) {
            return Err(SourceError::Fetch(format!(
                "source {} contains the working directory",
                source.display()
            )));
        }

        // The blocking copy outlives this future if it is dropped (e.g. on timeout)
        let cancel = CancelOnDrop::default();
        let cancelled = cancel.flag();
        let source = source.to_path_buf();
        let target = target.to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&source, &target, &cancelled))
            .await
            .map_err(|e| SourceError::Fetch(format!("copy task failed: {}", e)))??;
        debug!(files = copied, "Copied local source tree");
    } else {
        let file_name = source.file_name().ok_or_else(|| {
            SourceError::Fetch(format!("source {} has no file name", source.display()))
        })?;
        tokio::fs::copy(source, target.join(file_name)).await?;
        debug!("Copied single-file source");
    }
    Ok(())
}

/// Sets its flag when dropped
#[derive(Default)]
struct CancelOnDrop {
    flag: Arc<AtomicBool>,
}

impl CancelOnDrop {
    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Copies entries of `source` into the existing directory `target`.
///
/// Directories are created one level at a time, so a `target` removed mid-copy is never
/// recreated. Stops with `Interrupted` once `cancelled` is set.
fn copy_tree(source: &Path, target: &Path, cancelled: &AtomicBool) -> io::Result<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        if cancelled.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "source copy cancelled",
            ));
        }
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let dest = target.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir(&dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    let points_to = fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, dest)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(link, dest).map(|_| ())
}
