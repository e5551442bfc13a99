//! Command handlers
//!
//! Each handler resolves its project, runs one orchestrator operation and prints the result
//! to stdout. Errors are reported on stderr and mapped to a process exit code.

use crate::cli::commands::{Commands, CreateArgs, ProjectRef, UpdateArgs};
use crate::cli::output::OutputFormatter;
use crate::config::LaunchpadConfig;
use crate::deploy::{Orchestrator, OrchestratorSettings};
use crate::error::DeployError;
use crate::project::{NewProject, Project, ProjectUpdate};
use crate::routing::NginxRouter;
use crate::runtime::DockerProvisioner;
use crate::store::JsonFileStore;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

pub async fn handle_command(command: &Commands, config: &LaunchpadConfig) -> i32 {
    match execute(command, config).await {
        Ok(output) => {
            if !output.is_empty() {
                print!("{}", output);
                if !output.ends_with('\n') {
                    println!();
                }
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<DeployError>() {
                Some(deploy_error) => eprintln!("{}", deploy_error.help_message()),
                None => eprintln!("Error: {:#}", e),
            }
            EXIT_FAILURE
        }
    }
}

async fn execute(command: &Commands, config: &LaunchpadConfig) -> Result<String> {
    match command {
        Commands::Config(args) => {
            OutputFormatter::new(args.format.into(), &config.domain).format_config(config)
        }
        project_command => {
            let orchestrator = build_orchestrator(config).await?;
            run_project_command(&orchestrator, project_command, config).await
        }
    }
}

async fn run_project_command(
    orchestrator: &Orchestrator,
    command: &Commands,
    config: &LaunchpadConfig,
) -> Result<String> {
    match command {
        Commands::Config(_) => unreachable!("config is answered before the orchestrator is built"),
        Commands::Create(args) => handle_create(orchestrator, args, config).await,
        Commands::List(args) => {
            let projects = orchestrator.list().await?;
            OutputFormatter::new(args.format.into(), &config.domain).format_projects(&projects)
        }
        Commands::Show(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            OutputFormatter::new(args.output.format.into(), &config.domain)
                .format_project(&project)
        }
        Commands::Update(args) => handle_update(orchestrator, args, config).await,
        Commands::Deploy(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            info!(project = %project.name, "Deploying");
            let project = orchestrator.deploy(project.id).await?;
            OutputFormatter::new(args.output.format.into(), &config.domain)
                .format_project(&project)
        }
        Commands::Start(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            let project = orchestrator.start(project.id).await?;
            OutputFormatter::new(args.output.format.into(), &config.domain)
                .format_project(&project)
        }
        Commands::Stop(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            let project = orchestrator.stop(project.id).await?;
            OutputFormatter::new(args.output.format.into(), &config.domain)
                .format_project(&project)
        }
        Commands::Delete(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            let report = orchestrator.delete(project.id).await?;
            OutputFormatter::new(args.output.format.into(), &config.domain)
                .format_cleanup(&project, &report)
        }
        Commands::Logs(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            Ok(orchestrator
                .logs(project.id, args.tail)
                .await?
                .unwrap_or_else(|| "No logs available\n".to_string()))
        }
        Commands::Status(args) => {
            let project = resolve(orchestrator, &args.project).await?;
            let runtime = orchestrator.runtime_status(project.id).await?;
            OutputFormatter::new(args.output.format.into(), &config.domain)
                .format_status(&project, runtime.as_deref())
        }
    }
}

async fn handle_create(
    orchestrator: &Orchestrator,
    args: &CreateArgs,
    config: &LaunchpadConfig,
) -> Result<String> {
    let mut new = NewProject::new(args.name.clone(), args.kind.into(), args.origin());
    if let Some(ref prefix) = args.hostname_prefix {
        new = new.with_hostname_prefix(prefix.clone());
    }
    if let Some(ref command) = args.launch_command {
        new = new.with_launch_command(command.clone());
    }
    if let Some(ref description) = args.description {
        new = new.with_description(description.clone());
    }

    let project = orchestrator.create(new).await?;
    info!(project = %project.name, id = %project.id, "Project created");
    OutputFormatter::new(args.output.format.into(), &config.domain).format_project(&project)
}

async fn handle_update(
    orchestrator: &Orchestrator,
    args: &UpdateArgs,
    config: &LaunchpadConfig,
) -> Result<String> {
    let project = resolve(orchestrator, &args.project).await?;
    let update = ProjectUpdate {
        description: args.description.clone(),
        launch_command: args.launch_command.clone(),
    };
    let project = orchestrator.update(project.id, update).await?;
    OutputFormatter::new(args.output.format.into(), &config.domain).format_project(&project)
}

async fn resolve(orchestrator: &Orchestrator, project: &ProjectRef) -> Result<Project> {
    let found = match project {
        ProjectRef::Id(id) => orchestrator.get(*id).await?,
        ProjectRef::Name(name) => orchestrator.get_by_name(name).await?,
    };
    Ok(found)
}

async fn build_orchestrator(config: &LaunchpadConfig) -> Result<Orchestrator> {
    debug!(state_file = %config.state_file.display(), "Opening project store");
    let store = JsonFileStore::open(&config.state_file)
        .await
        .with_context(|| {
            format!(
                "Failed to open project store at {}",
                config.state_file.display()
            )
        })?;

    let runtime = DockerProvisioner::connect()
        .map_err(DeployError::from)?
        .with_docker_binary(config.docker_bin.clone());
    let router = NginxRouter::new(&config.nginx_config_dir, config.domain.clone())
        .with_nginx_binary(config.nginx_bin.clone());
    let settings = OrchestratorSettings::from_config(config);

    Ok(Orchestrator::new(
        Arc::new(store),
        Arc::new(runtime),
        Arc::new(router),
        settings,
    ))
}
