//! Logging-based progress handler

use super::{DeployEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs deploy events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &DeployEvent) {
        match event {
            DeployEvent::Started { project } => {
                info!(project = %project, "Starting deploy");
            }
            DeployEvent::StepStarted { project, step } => {
                debug!(project = %project, step = %step, "Step started");
            }
            DeployEvent::StepComplete {
                project,
                step,
                duration,
            } => {
                info!(
                    project = %project,
                    step = %step,
                    duration_ms = duration.as_millis(),
                    "Step complete"
                );
            }
            DeployEvent::Completed {
                project,
                total_time,
            } => {
                info!(
                    project = %project,
                    total_time_ms = total_time.as_millis(),
                    "Deploy complete"
                );
            }
            DeployEvent::Failed {
                project,
                step,
                error,
            } => match step {
                Some(step) => warn!(project = %project, step = %step, error = %error, "Deploy failed"),
                None => warn!(project = %project, error = %error, "Deploy failed"),
            },
        }
    }
}
