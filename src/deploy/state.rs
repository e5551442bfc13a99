//! Status transitions of a project record
//!
//! Every status change the orchestrator makes goes through one of these functions. They only
//! touch the record; persisting it is the caller's job.

use crate::error::{DeployError, DeployResult};
use crate::project::{InstanceHandle, Project, ProjectStatus};

/// Any status → BUILDING. Clears the previous attempt's error.
pub fn begin_build(project: &mut Project) -> DeployResult<()> {
    project.status = ProjectStatus::Building;
    project.error_message = None;
    project.touch();
    Ok(())
}

/// BUILDING → RUNNING. `handle` is the new instance for server-side projects.
pub fn finish_running(project: &mut Project, handle: Option<InstanceHandle>) -> DeployResult<()> {
    require(project, ProjectStatus::Building, "complete deploy of")?;
    project.status = ProjectStatus::Running;
    project.runtime_handle = handle;
    project.error_message = None;
    project.touch();
    Ok(())
}

/// BUILDING → FAILED with the failure message recorded verbatim
pub fn fail(project: &mut Project, message: impl Into<String>) -> DeployResult<()> {
    require(project, ProjectStatus::Building, "fail deploy of")?;
    project.status = ProjectStatus::Failed;
    project.error_message = Some(message.into());
    project.touch();
    Ok(())
}

/// STOPPED or FAILED → RUNNING (start)
pub fn mark_running(project: &mut Project) -> DeployResult<()> {
    match project.status {
        ProjectStatus::Stopped | ProjectStatus::Failed | ProjectStatus::Running => {
            project.status = ProjectStatus::Running;
            project.error_message = None;
            project.touch();
            Ok(())
        }
        from => Err(DeployError::InvalidTransition {
            from,
            action: "start",
        }),
    }
}

/// Any status → STOPPED (stop). A leftover BUILDING from an interrupted run is also cleared.
pub fn mark_stopped(project: &mut Project) -> DeployResult<()> {
    project.status = ProjectStatus::Stopped;
    project.touch();
    Ok(())
}

/// Records an error without changing status
pub fn record_error(project: &mut Project, message: impl Into<String>) {
    project.error_message = Some(message.into());
    project.touch();
}

fn require(project: &Project, expected: ProjectStatus, action: &'static str) -> DeployResult<()> {
    if project.status == expected {
        Ok(())
    } else {
        Err(DeployError::InvalidTransition {
            from: project.status,
            action,
        })
    }
}
