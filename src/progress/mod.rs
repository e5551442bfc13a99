//! Progress reporting for deploy operations

mod handler;
mod logging;

pub use handler::{DeployEvent, DeployStep, NoOpHandler, ProgressHandler};
pub use logging::LoggingHandler;
