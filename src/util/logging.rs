//! Structured logging setup for launchpad
//!
//! Installs a `tracing` subscriber writing to stderr, so stdout stays free for command
//! output. `RUST_LOG` takes precedence over the configured level when set.
//!
//! # Example
//!
//! ```no_run
//! use launchpad::util::{init_logging, LoggingConfig};
//! use tracing::Level;
//!
//! init_logging(LoggingConfig::with_level(Level::DEBUG));
//! tracing::info!(project = "web", "Deploy started");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Dependencies that are noisy at debug level
const QUIET_TARGETS: &[&str] = &["bollard=warn", "hyper=warn", "hyper_util=warn"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for launchpad's own events
    pub level: Level,

    /// One JSON object per line instead of human-readable output
    pub use_json: bool,

    /// Include the module target (e.g. launchpad::deploy) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output with targets and source locations, for log shippers
    pub fn json(mut self) -> Self {
        self.use_json = true;
        self.include_target = true;
        self.include_location = true;
        self
    }
}

/// Parses a level name case-insensitively
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if env::var("RUST_LOG").is_ok() {
        return EnvFilter::from_default_env();
    }

    let mut filter = EnvFilter::new("warn");
    let own = format!("launchpad={}", config.level.as_str().to_lowercase());
    for directive in std::iter::once(own.as_str()).chain(QUIET_TARGETS.iter().copied()) {
        if let Ok(directive) = directive.parse::<Directive>() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Initializes the subscriber. Later calls are ignored.
///
/// Plain output is colored only when stderr is a terminal.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(atty::is(atty::Stream::Stderr))
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}
