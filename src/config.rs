//! Configuration management for launchpad
//!
//! All settings come from environment variables layered over built-in defaults.
//!
//! # Environment Variables
//!
//! - `LAUNCHPAD_DOMAIN`: Public domain projects are published under - default: "launch.me"
//! - `LAUNCHPAD_NGINX_CONFIG_DIR`: Directory nginx includes units from - default:
//!   "/etc/nginx/sites-enabled"
//! - `LAUNCHPAD_NGINX_BIN`: nginx executable - default: "nginx"
//! - `LAUNCHPAD_DOCKER_BIN`: docker CLI used for image builds - default: "docker"
//! - `LAUNCHPAD_GIT_BIN`: git executable used for clones - default: "git"
//! - `LAUNCHPAD_PROJECTS_DIR`: Root of per-project working directories - default: "./data/projects"
//! - `LAUNCHPAD_STATE_FILE`: JSON state file - default: "./data/projects.json"
//! - `LAUNCHPAD_PORT_RANGE_START` / `LAUNCHPAD_PORT_RANGE_END`: Host port range - default: 10000-20000
//! - `LAUNCHPAD_FETCH_TIMEOUT`: Source fetch timeout in seconds - default: "300"
//! - `LAUNCHPAD_BUILD_TIMEOUT`: Image build timeout in seconds - default: "1800"
//! - `LAUNCHPAD_START_TIMEOUT`: Instance start timeout in seconds - default: "120"
//! - `LAUNCHPAD_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use launchpad::LaunchpadConfig;
//!
//! let config = LaunchpadConfig::from_env().expect("Invalid environment");
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::ports::{PortRange, DEFAULT_PORT_RANGE_END, DEFAULT_PORT_RANGE_START};
use serde::Serialize;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DOMAIN: &str = "launch.me";
const DEFAULT_NGINX_CONFIG_DIR: &str = "/etc/nginx/sites-enabled";
const DEFAULT_NGINX_BIN: &str = "nginx";
const DEFAULT_DOCKER_BIN: &str = "docker";
const DEFAULT_GIT_BIN: &str = "git";
const DEFAULT_PROJECTS_DIR: &str = "./data/projects";
const DEFAULT_STATE_FILE: &str = "./data/projects.json";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 300;
const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_START_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Ports below this need root and collide with system services
const MIN_PORT: u16 = 1024;
const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Main configuration structure for launchpad
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchpadConfig {
    pub domain: String,
    pub nginx_config_dir: PathBuf,
    pub nginx_bin: String,
    pub docker_bin: String,
    pub git_bin: String,
    pub projects_dir: PathBuf,
    pub state_file: PathBuf,
    pub port_range_start: u16,
    pub port_range_end: u16,
    pub fetch_timeout_secs: u64,
    pub build_timeout_secs: u64,
    pub start_timeout_secs: u64,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for LaunchpadConfig {
    /// Built-in defaults, ignoring the environment
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            nginx_config_dir: PathBuf::from(DEFAULT_NGINX_CONFIG_DIR),
            nginx_bin: DEFAULT_NGINX_BIN.to_string(),
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
            git_bin: DEFAULT_GIT_BIN.to_string(),
            projects_dir: PathBuf::from(DEFAULT_PROJECTS_DIR),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            port_range_start: DEFAULT_PORT_RANGE_START,
            port_range_end: DEFAULT_PORT_RANGE_END,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            build_timeout_secs: DEFAULT_BUILD_TIMEOUT_SECS,
            start_timeout_secs: DEFAULT_START_TIMEOUT_SECS,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LaunchpadConfig {
    /// Loads `LAUNCHPAD_*` variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` when a numeric variable is set but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            domain: env_string("LAUNCHPAD_DOMAIN").unwrap_or(defaults.domain),
            nginx_config_dir: env_string("LAUNCHPAD_NGINX_CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.nginx_config_dir),
            nginx_bin: env_string("LAUNCHPAD_NGINX_BIN").unwrap_or(defaults.nginx_bin),
            docker_bin: env_string("LAUNCHPAD_DOCKER_BIN").unwrap_or(defaults.docker_bin),
            git_bin: env_string("LAUNCHPAD_GIT_BIN").unwrap_or(defaults.git_bin),
            projects_dir: env_string("LAUNCHPAD_PROJECTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.projects_dir),
            state_file: env_string("LAUNCHPAD_STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_file),
            port_range_start: env_parse("LAUNCHPAD_PORT_RANGE_START")?
                .unwrap_or(defaults.port_range_start),
            port_range_end: env_parse("LAUNCHPAD_PORT_RANGE_END")?
                .unwrap_or(defaults.port_range_end),
            fetch_timeout_secs: env_parse("LAUNCHPAD_FETCH_TIMEOUT")?
                .unwrap_or(defaults.fetch_timeout_secs),
            build_timeout_secs: env_parse("LAUNCHPAD_BUILD_TIMEOUT")?
                .unwrap_or(defaults.build_timeout_secs),
            start_timeout_secs: env_parse("LAUNCHPAD_START_TIMEOUT")?
                .unwrap_or(defaults.start_timeout_secs),
            log_level: env_string("LAUNCHPAD_LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or(defaults.log_level),
        })
    }

    /// Validates the configuration
    ///
    /// Checks that:
    /// - The port range is non-empty and above the privileged ports
    /// - Each timeout is between 1 second and 1 day
    /// - Log level is valid
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Domain must not be empty".to_string(),
            ));
        }

        if self.port_range_start > self.port_range_end {
            return Err(ConfigError::ValidationFailed(format!(
                "Port range start {} is above end {}",
                self.port_range_start, self.port_range_end
            )));
        }
        if self.port_range_start < MIN_PORT {
            return Err(ConfigError::ValidationFailed(format!(
                "Port range must start at {} or above",
                MIN_PORT
            )));
        }

        for (name, secs) in [
            ("Fetch", self.fetch_timeout_secs),
            ("Build", self.build_timeout_secs),
            ("Start", self.start_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} timeout must be at least 1 second",
                    name
                )));
            }
            if secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} timeout cannot exceed 1 day",
                    name
                )));
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn port_range(&self) -> PortRange {
        PortRange::new(self.port_range_start, self.port_range_end)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }
}

impl fmt::Display for LaunchpadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Launchpad Configuration:")?;
        writeln!(f, "  Domain: {}", self.domain)?;
        writeln!(f, "  Nginx Config Dir: {}", self.nginx_config_dir.display())?;
        writeln!(f, "  Nginx Binary: {}", self.nginx_bin)?;
        writeln!(f, "  Docker Binary: {}", self.docker_bin)?;
        writeln!(f, "  Git Binary: {}", self.git_bin)?;
        writeln!(f, "  Projects Dir: {}", self.projects_dir.display())?;
        writeln!(f, "  State File: {}", self.state_file.display())?;
        writeln!(
            f,
            "  Port Range: {}-{}",
            self.port_range_start, self.port_range_end
        )?;
        writeln!(
            f,
            "  Timeouts: fetch {}s, build {}s, start {}s",
            self.fetch_timeout_secs, self.build_timeout_secs, self.start_timeout_secs
        )?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    env_string(key)
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: e.to_string(),
            })
        })
        .transpose()
}
