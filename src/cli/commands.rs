use crate::project::{ProjectId, ProjectKind, SourceOrigin};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Deploy static sites and containerised services behind nginx on a single host
#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    about = "Deploy static sites and containerised services behind nginx on a single host",
    version,
    long_about = "launchpad keeps a registry of projects, fetches their source from a local path \
                  or a git repository, builds server-side projects into Docker images and \
                  publishes every project under <prefix>.<domain> through nginx.\n\n\
                  Settings are read from LAUNCHPAD_* environment variables."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Verbose output (debug logging)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "human",
        help = "Log output format"
    )]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Register a new project",
        long_about = "Registers a project without deploying it. Server-side projects get their \
                      host port immediately.\n\n\
                      Examples:\n  \
                      launchpad create docs --kind static --source local --location ./site\n  \
                      launchpad create api --kind server-side --source git \
                      --location https://github.com/acme/api.git --launch-command 'node server.js'"
    )]
    Create(CreateArgs),

    #[command(about = "List all projects")]
    List(FormatArgs),

    #[command(about = "Show one project")]
    Show(ProjectArgs),

    #[command(about = "Edit a project's description or launch command")]
    Update(UpdateArgs),

    #[command(
        about = "Fetch, build and publish a project",
        long_about = "Runs the full deploy pipeline: fetch the source into the project's working \
                      directory, then either publish it as a static site or build an image, start \
                      a container and proxy to it. The project ends RUNNING or FAILED."
    )]
    Deploy(ProjectArgs),

    #[command(about = "Start a stopped project without rebuilding")]
    Start(ProjectArgs),

    #[command(about = "Stop a running project")]
    Stop(ProjectArgs),

    #[command(about = "Remove a project with its container, routing unit and working directory")]
    Delete(ProjectArgs),

    #[command(about = "Show container logs of a server-side project")]
    Logs(LogsArgs),

    #[command(about = "Show the runtime state of a project's container")]
    Status(ProjectArgs),

    #[command(about = "Show the effective configuration")]
    Config(FormatArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FormatArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(value_name = "PROJECT", help = "Project id or name")]
    pub project: ProjectRef,

    #[command(flatten)]
    pub output: FormatArgs,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(value_name = "NAME", help = "Project name ([a-z0-9-], at most 50 characters)")]
    pub name: String,

    #[arg(long, value_enum, help = "Kind of workload")]
    pub kind: KindArg,

    #[arg(long, value_enum, help = "Where the source comes from")]
    pub source: SourceArg,

    #[arg(long, value_name = "PATH|URL", help = "Local path or git repository URL")]
    pub location: String,

    #[arg(long, value_name = "PREFIX", help = "Hostname prefix (defaults to the name)")]
    pub hostname_prefix: Option<String>,

    #[arg(
        long,
        value_name = "COMMAND",
        help = "Container start command, replacing the detected default"
    )]
    pub launch_command: Option<String>,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[command(flatten)]
    pub output: FormatArgs,
}

impl CreateArgs {
    pub fn origin(&self) -> SourceOrigin {
        match self.source {
            SourceArg::Local => SourceOrigin::Local(PathBuf::from(&self.location)),
            SourceArg::Git => SourceOrigin::Git(self.location.clone()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[arg(value_name = "PROJECT", help = "Project id or name")]
    pub project: ProjectRef,

    #[arg(long, value_name = "TEXT")]
    pub description: Option<String>,

    #[arg(long, value_name = "COMMAND")]
    pub launch_command: Option<String>,

    #[command(flatten)]
    pub output: FormatArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    #[arg(value_name = "PROJECT", help = "Project id or name")]
    pub project: ProjectRef,

    #[arg(long, default_value = "100", help = "Number of lines from the end")]
    pub tail: usize,
}

/// A project addressed by numeric id or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRef {
    Id(ProjectId),
    Name(String),
}

impl FromStr for ProjectRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("project id or name must not be empty".to_string());
        }
        Ok(match s.parse::<u64>() {
            Ok(id) => ProjectRef::Id(ProjectId(id)),
            Err(_) => ProjectRef::Name(s.to_string()),
        })
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectRef::Id(id) => write!(f, "{}", id),
            ProjectRef::Name(name) => f.write_str(name),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Static,
    ServerSide,
}

impl From<KindArg> for ProjectKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Static => ProjectKind::Static,
            KindArg::ServerSide => ProjectKind::ServerSide,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceArg {
    Local,
    Git,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Human,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
