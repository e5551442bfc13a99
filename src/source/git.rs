use super::SourceError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Full clone of `url` into the (empty) `target` directory.
pub(super) async fn clone_into(git_bin: &str, url: &str, target: &Path) -> Result<(), SourceError> {
    info!(repo = %url, "Cloning repository");

    let mut cmd = Command::new(git_bin);
    cmd.arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(target)
        // fail fast on private repositories instead of waiting for a credential prompt
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(command = ?cmd, "Running git clone");

    let output = cmd
        .output()
        .await
        .map_err(|e| SourceError::Fetch(format!("Failed to run {}: {}", git_bin, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr.trim();
        return Err(SourceError::Fetch(if message.is_empty() {
            format!("git clone exited with {}", output.status)
        } else {
            format!("Failed to clone repository: {}", message)
        }));
    }

    info!("Repository cloned successfully");
    Ok(())
}
