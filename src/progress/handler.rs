//! Progress handler trait and events

use std::fmt;
use std::time::Duration;

/// Pipeline steps of a deploy, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    FetchSource,
    PrepareRecipe,
    BuildImage,
    StartInstance,
    ConfigureRouting,
}

impl DeployStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeployStep::FetchSource => "fetch source",
            DeployStep::PrepareRecipe => "prepare recipe",
            DeployStep::BuildImage => "build image",
            DeployStep::StartInstance => "start instance",
            DeployStep::ConfigureRouting => "configure routing",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted while a deploy runs
#[derive(Debug, Clone)]
pub enum DeployEvent {
    Started { project: String },

    StepStarted { project: String, step: DeployStep },

    StepComplete {
        project: String,
        step: DeployStep,
        duration: Duration,
    },

    /// Project reached RUNNING
    Completed {
        project: String,
        total_time: Duration,
    },

    /// Project moved to FAILED; `step` is the step that failed
    Failed {
        project: String,
        step: Option<DeployStep>,
        error: String,
    },
}

/// Trait for handling deploy progress events
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &DeployEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &DeployEvent) {}
}
