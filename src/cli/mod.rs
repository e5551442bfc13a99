pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ProjectRef};
pub use handlers::{handle_command, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
pub use output::{OutputFormat, OutputFormatter};
