use launchpad::cli::commands::{CliArgs, LogFormatArg};
use launchpad::cli::{handle_command, EXIT_CONFIG_ERROR};
use launchpad::util::{init_logging, parse_level, LoggingConfig};
use launchpad::{LaunchpadConfig, VERSION};

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let config = match LaunchpadConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    init_logging_from_args(&args, &config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_CONFIG_ERROR);
    }

    debug!("launchpad v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = handle_command(&args.command, &config).await;
    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &LaunchpadConfig) {
    let level = if let Some(level_str) = &args.log_level {
        level_or_default(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        level_or_default(&config.log_level)
    };

    let logging = LoggingConfig::with_level(level);
    let logging = match args.log_format {
        LogFormatArg::Json => logging.json(),
        LogFormatArg::Human => logging,
    };
    init_logging(logging);
}

fn level_or_default(level_str: &str) -> Level {
    parse_level(level_str).unwrap_or_else(|| {
        eprintln!(
            "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
            level_str
        );
        Level::INFO
    })
}
