use super::templates::{proxy_unit, static_unit};
use super::{ReloadOutcome, RoutingError, TrafficRouter};
use crate::cleanup::Removal;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const DEFAULT_NGINX_BIN: &str = "nginx";

/// Writes one `<prefix>.conf` per project into an nginx include directory.
///
/// Every change is validated with `nginx -t` before `nginx -s reload`. A unit the validator
/// rejects is rolled back to what was on disk before the write.
///
/// `nginx -t` checks the whole include directory, so every write, validation, reload and
/// rollback runs under one lock. Otherwise a bad unit from one project could fail the check
/// for another.
pub struct NginxRouter {
    config_dir: PathBuf,
    domain: String,
    nginx_bin: String,
    config_lock: Mutex<()>,
}

impl NginxRouter {
    pub fn new(config_dir: impl Into<PathBuf>, domain: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            domain: domain.into(),
            nginx_bin: DEFAULT_NGINX_BIN.to_string(),
            config_lock: Mutex::new(()),
        }
    }

    pub fn with_nginx_binary(mut self, nginx_bin: impl Into<String>) -> Self {
        self.nginx_bin = nginx_bin.into();
        self
    }

    pub fn unit_path(&self, prefix: &str) -> PathBuf {
        self.config_dir.join(format!("{}.conf", prefix))
    }

    fn hostname(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.domain)
    }

    async fn publish(&self, prefix: &str, unit: String) -> Result<ReloadOutcome, RoutingError> {
        let _guard = self.config_lock.lock().await;
        tokio::fs::create_dir_all(&self.config_dir).await?;
        let path = self.unit_path(prefix);
        let previous = match tokio::fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        tokio::fs::write(&path, unit).await?;
        debug!(path = %path.display(), "Wrote routing unit");

        match self.reload().await {
            Err(RoutingError::Rejected(output)) => {
                self.rollback(&path, previous).await;
                Err(RoutingError::Rejected(output))
            }
            other => other,
        }
    }

    async fn rollback(&self, path: &Path, previous: Option<String>) {
        let result = match previous {
            Some(content) => tokio::fs::write(path, content).await,
            None => tokio::fs::remove_file(path).await,
        };
        match result {
            Ok(()) => info!(path = %path.display(), "Rolled back rejected routing unit"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to roll back routing unit"),
        }
    }

    /// Validate, then reload. A missing nginx binary is reported as `Unavailable`.
    ///
    /// Callers hold `config_lock`.
    async fn reload(&self) -> Result<ReloadOutcome, RoutingError> {
        let check = match self.run(&["-t"]).await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(bin = %self.nginx_bin, "nginx not found, skipping reload");
                return Ok(ReloadOutcome::Unavailable);
            }
            Err(e) => {
                return Err(RoutingError::Reload(format!(
                    "Failed to run {}: {}",
                    self.nginx_bin, e
                )))
            }
        };
        if !check.status.success() {
            return Err(RoutingError::Rejected(diagnostics(&check)));
        }

        let reload = self.run(&["-s", "reload"]).await.map_err(|e| {
            RoutingError::Reload(format!("Failed to run {}: {}", self.nginx_bin, e))
        })?;
        if !reload.status.success() {
            return Err(RoutingError::Reload(diagnostics(&reload)));
        }

        info!("nginx reloaded");
        Ok(ReloadOutcome::Reloaded)
    }

    async fn run(&self, args: &[&str]) -> io::Result<std::process::Output> {
        Command::new(&self.nginx_bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
    }
}

#[async_trait]
impl TrafficRouter for NginxRouter {
    #[instrument(skip_all, fields(prefix = %prefix, root = %root.display()))]
    async fn publish_static(
        &self,
        prefix: &str,
        root: &Path,
    ) -> Result<ReloadOutcome, RoutingError> {
        let unit = static_unit(&self.hostname(prefix), root);
        self.publish(prefix, unit).await
    }

    #[instrument(skip(self))]
    async fn publish_proxy(&self, prefix: &str, port: u16) -> Result<ReloadOutcome, RoutingError> {
        let unit = proxy_unit(&self.hostname(prefix), port);
        self.publish(prefix, unit).await
    }

    #[instrument(skip(self))]
    async fn unpublish(&self, prefix: &str) -> Result<Removal, RoutingError> {
        let _guard = self.config_lock.lock().await;
        let path = self.unit_path(prefix);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Removal::AlreadyAbsent),
            Err(e) => return Err(e.into()),
        }
        self.reload().await?;
        Ok(Removal::Removed)
    }
}

/// nginx writes its diagnostics to stderr
fn diagnostics(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}
