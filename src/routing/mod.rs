//! Reverse-proxy routing units, one per project hostname

mod nginx;
mod templates;

pub use nginx::NginxRouter;
pub use templates::{proxy_unit, static_unit};

use crate::cleanup::Removal;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    /// The proxy's validator refused the configuration; carries its output
    #[error("nginx rejected the configuration: {0}")]
    Rejected(String),

    #[error("nginx reload failed: {0}")]
    Reload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a configuration change reached the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Reloaded,
    /// Proxy binary not installed; the unit is on disk but nothing was reloaded
    Unavailable,
}

#[async_trait]
pub trait TrafficRouter: Send + Sync {
    /// Serves the files under `root` at `<prefix>.<domain>`
    async fn publish_static(&self, prefix: &str, root: &Path)
        -> Result<ReloadOutcome, RoutingError>;

    /// Proxies `<prefix>.<domain>` to `localhost:<port>`
    async fn publish_proxy(&self, prefix: &str, port: u16) -> Result<ReloadOutcome, RoutingError>;

    async fn unpublish(&self, prefix: &str) -> Result<Removal, RoutingError>;
}
