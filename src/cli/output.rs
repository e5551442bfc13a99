//! Output formatting for command results
//!
//! Records can be printed as JSON, YAML or human-readable text. JSON and YAML carry the
//! stored record plus its public `hostname`, which depends on the configured domain.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::cleanup::CleanupReport;
use crate::config::LaunchpadConfig;
use crate::project::{Project, ProjectStatus};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
    domain: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, domain: impl Into<String>) -> Self {
        Self {
            format,
            domain: domain.into(),
        }
    }

    pub fn format_project(&self, project: &Project) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(&self.project_value(project)?),
            OutputFormat::Yaml => to_yaml(&self.project_value(project)?),
            OutputFormat::Human => Ok(self.project_human(project)),
        }
    }

    pub fn format_projects(&self, projects: &[Project]) -> Result<String> {
        match self.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let values = projects
                    .iter()
                    .map(|p| self.project_value(p))
                    .collect::<Result<Vec<_>>>()?;
                if self.format == OutputFormat::Json {
                    to_json(&values)
                } else {
                    to_yaml(&values)
                }
            }
            OutputFormat::Human => Ok(self.projects_human(projects)),
        }
    }

    pub fn format_cleanup(&self, project: &Project, report: &CleanupReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Yaml => to_yaml(report),
            OutputFormat::Human => {
                let mut output = if report.is_clean() {
                    format!("\u{2713} Deleted {}\n", project.name)
                } else {
                    format!("\u{26A0} Deleted {} with cleanup failures\n", project.name)
                };
                for (step, outcome) in report.steps() {
                    output.push_str(&format!("  {:<9} {}\n", format!("{}:", step), outcome));
                }
                Ok(output)
            }
        }
    }

    /// Record status next to what the container runtime reports, if anything
    pub fn format_status(&self, project: &Project, runtime: Option<&str>) -> Result<String> {
        match self.format {
            OutputFormat::Json | OutputFormat::Yaml => {
                let value = serde_json::json!({
                    "id": project.id,
                    "name": project.name,
                    "status": project.status,
                    "runtime": runtime,
                });
                if self.format == OutputFormat::Json {
                    to_json(&value)
                } else {
                    to_yaml(&value)
                }
            }
            OutputFormat::Human => {
                let runtime = match (project.is_server_side(), runtime) {
                    (false, _) => "n/a (static)",
                    (true, Some(state)) => state,
                    (true, None) => "no instance",
                };
                Ok(format!(
                    "{} {}: {} (instance: {})\n",
                    status_marker(project.status),
                    project.name,
                    project.status,
                    runtime
                ))
            }
        }
    }

    pub fn format_config(&self, config: &LaunchpadConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => to_json(config),
            OutputFormat::Yaml => to_yaml(config),
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn project_value(&self, project: &Project) -> Result<Value> {
        let mut value =
            serde_json::to_value(project).context("Failed to serialize project record")?;
        if let Value::Object(ref mut map) = value {
            map.insert(
                "hostname".to_string(),
                Value::String(project.hostname(&self.domain)),
            );
        }
        Ok(value)
    }

    fn project_human(&self, project: &Project) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} {} (#{})\n",
            status_marker(project.status),
            project.name,
            project.id
        ));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Status:      {}\n", project.status));
        output.push_str(&format!("Kind:        {}\n", project.kind));
        output.push_str(&format!(
            "Hostname:    {}\n",
            project.hostname(&self.domain)
        ));
        output.push_str(&format!("Source:      {}\n", project.source));
        if let Some(port) = project.port {
            output.push_str(&format!("Port:        {}\n", port));
        }
        if let Some(ref handle) = project.runtime_handle {
            output.push_str(&format!("Instance:    {}\n", short_handle(handle.as_str())));
        }
        if let Some(ref command) = project.launch_command {
            output.push_str(&format!("Command:     {}\n", command));
        }
        if let Some(ref recipe) = project.recipe_path {
            output.push_str(&format!("Recipe:      {}\n", recipe.display()));
        }
        if let Some(ref description) = project.description {
            output.push_str(&format!("Description: {}\n", description));
        }
        output.push_str(&format!(
            "Updated:     {}\n",
            project.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));

        if let Some(ref error) = project.error_message {
            output.push_str(&format!("\n\u{26A0} Last error:\n  {}\n", error));
        }
        output
    }

    fn projects_human(&self, projects: &[Project]) -> String {
        if projects.is_empty() {
            return "No projects\n".to_string();
        }

        let mut output = format!(
            "{:<5} {:<20} {:<12} {:<9} {:<6} {}\n",
            "ID", "NAME", "KIND", "STATUS", "PORT", "HOSTNAME"
        );
        for project in projects {
            output.push_str(&format!(
                "{:<5} {:<20} {:<12} {:<9} {:<6} {}\n",
                project.id.to_string(),
                project.name,
                project.kind.to_string(),
                project.status.to_string(),
                project
                    .port
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                project.hostname(&self.domain)
            ));
        }
        output
    }
}

fn status_marker(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Running => "\u{2713}",
        ProjectStatus::Failed => "\u{2717}",
        ProjectStatus::Building => "\u{2026}",
        ProjectStatus::Stopped => "\u{25CB}",
    }
}

/// Docker ids are 64 hex chars; the first 12 are what `docker ps` shows
fn short_handle(handle: &str) -> &str {
    if handle.len() == 64 && handle.chars().all(|c| c.is_ascii_hexdigit()) {
        &handle[..12]
    } else {
        handle
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output to JSON")
}

fn to_yaml<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize output to YAML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::StepOutcome;
    use crate::project::{InstanceHandle, NewProject, ProjectId, ProjectKind, SourceOrigin};

    fn api() -> Project {
        let mut project = Project::from_new(
            NewProject::new(
                "api",
                ProjectKind::ServerSide,
                SourceOrigin::Git("https://github.com/acme/api.git".to_string()),
            )
            .with_launch_command("node server.js"),
            Some(10432),
        );
        project.id = ProjectId(3);
        project
    }

    #[test]
    fn test_json_includes_hostname() {
        let formatter = OutputFormatter::new(OutputFormat::Json, "launch.me");
        let output = formatter.format_project(&api()).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["hostname"], "api.launch.me");
        assert_eq!(value["port"], 10432);
        assert_eq!(value["status"], "STOPPED");
    }

    #[test]
    fn test_yaml_output() {
        let formatter = OutputFormatter::new(OutputFormat::Yaml, "launch.me");
        let output = formatter.format_project(&api()).unwrap();
        assert!(output.contains("name: api"));
        assert!(output.contains("hostname: api.launch.me"));
    }

    #[test]
    fn test_human_project() {
        let mut project = api();
        project.status = ProjectStatus::Failed;
        project.error_message = Some("Failed to build image: exit 1".to_string());
        project.runtime_handle = Some(InstanceHandle("a".repeat(64)));

        let formatter = OutputFormatter::new(OutputFormat::Human, "launch.me");
        let output = formatter.format_project(&project).unwrap();
        assert!(output.starts_with("\u{2717} api (#3)"));
        assert!(output.contains("Hostname:    api.launch.me"));
        assert!(output.contains("Port:        10432"));
        assert!(output.contains(&format!("Instance:    {}\n", "a".repeat(12))));
        assert!(output.contains("Failed to build image: exit 1"));
    }

    #[test]
    fn test_human_list() {
        let formatter = OutputFormatter::new(OutputFormat::Human, "launch.me");
        assert_eq!(formatter.format_projects(&[]).unwrap(), "No projects\n");

        let output = formatter.format_projects(&[api()]).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("server-side"));
        assert!(lines[1].ends_with("api.launch.me"));
    }

    #[test]
    fn test_cleanup_report() {
        let report = CleanupReport {
            instance: StepOutcome::AlreadyAbsent,
            routing: StepOutcome::Done,
            workdir: StepOutcome::Failed("permission denied".to_string()),
        };
        let formatter = OutputFormatter::new(OutputFormat::Human, "launch.me");
        let output = formatter.format_cleanup(&api(), &report).unwrap();
        assert!(output.contains("with cleanup failures"));
        assert!(output.contains("instance: already absent"));
        assert!(output.contains("workdir:  failed: permission denied"));

        let json = OutputFormatter::new(OutputFormat::Json, "launch.me")
            .format_cleanup(&api(), &report)
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["workdir"]["outcome"], "failed");
    }

    #[test]
    fn test_status_output() {
        let human = OutputFormatter::new(OutputFormat::Human, "launch.me");
        assert_eq!(
            human.format_status(&api(), Some("exited")).unwrap(),
            "\u{25CB} api: STOPPED (instance: exited)\n"
        );
        assert!(human
            .format_status(&api(), None)
            .unwrap()
            .contains("no instance"));

        let json = OutputFormatter::new(OutputFormat::Json, "launch.me")
            .format_status(&api(), Some("running"))
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["runtime"], "running");
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn test_short_handle() {
        assert_eq!(short_handle("launchpad-api"), "launchpad-api");
        let id = "0123456789abcdef".repeat(4);
        assert_eq!(short_handle(&id), "0123456789ab");
    }
}
