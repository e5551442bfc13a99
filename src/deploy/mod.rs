//! Deployment orchestration

mod orchestrator;
pub mod state;

pub use orchestrator::Orchestrator;

use crate::config::LaunchpadConfig;
use crate::ports::PortRange;
use std::path::PathBuf;
use std::time::Duration;

/// Time limits for the external steps of a deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployTimeouts {
    pub fetch: Duration,
    pub build: Duration,
    pub start: Duration,
}

impl Default for DeployTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(300),
            build: Duration::from_secs(1800),
            start: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Each project's working directory is `<projects_dir>/<name>`
    pub projects_dir: PathBuf,
    pub domain: String,
    pub port_range: PortRange,
    pub timeouts: DeployTimeouts,
    pub git_bin: String,
}

impl OrchestratorSettings {
    pub fn new(projects_dir: impl Into<PathBuf>) -> Self {
        let defaults = LaunchpadConfig::default();
        Self {
            projects_dir: projects_dir.into(),
            port_range: defaults.port_range(),
            domain: defaults.domain,
            timeouts: DeployTimeouts::default(),
            git_bin: defaults.git_bin,
        }
    }

    pub fn from_config(config: &LaunchpadConfig) -> Self {
        Self {
            projects_dir: config.projects_dir.clone(),
            domain: config.domain.clone(),
            port_range: config.port_range(),
            timeouts: DeployTimeouts {
                fetch: config.fetch_timeout(),
                build: config.build_timeout(),
                start: config.start_timeout(),
            },
            git_bin: config.git_bin.clone(),
        }
    }

    pub fn with_port_range(mut self, port_range: PortRange) -> Self {
        self.port_range = port_range;
        self
    }

    pub fn with_timeouts(mut self, timeouts: DeployTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_follow_config() {
        let config = LaunchpadConfig {
            projects_dir: PathBuf::from("/srv/launchpad"),
            port_range_start: 30000,
            port_range_end: 30010,
            build_timeout_secs: 60,
            ..Default::default()
        };
        let settings = OrchestratorSettings::from_config(&config);
        assert_eq!(settings.projects_dir, PathBuf::from("/srv/launchpad"));
        assert_eq!(settings.port_range, PortRange::new(30000, 30010));
        assert_eq!(settings.timeouts.build, Duration::from_secs(60));
        assert_eq!(settings.timeouts.fetch, Duration::from_secs(300));
    }

    #[test]
    fn test_new_uses_default_config() {
        let settings = OrchestratorSettings::new("/srv/projects");
        let defaults = LaunchpadConfig::default();
        assert_eq!(settings.projects_dir, PathBuf::from("/srv/projects"));
        assert_eq!(settings.domain, defaults.domain);
        assert_eq!(settings.port_range, defaults.port_range());
        assert_eq!(settings.git_bin, defaults.git_bin);
        assert_eq!(settings.timeouts, DeployTimeouts::default());
    }
}
