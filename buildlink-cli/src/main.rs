//! Buildlink - stable download links for CI build artifacts
//!
//! Main entry point: the HTTP service plus offline schema tooling

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use buildlink_core::config::{ServiceConfig, DEFAULT_CONFIG_FILE};
use buildlink_core::service;

mod projects_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "buildlink",
    about = "Mirror a CI server's build catalog and serve stable artifact links",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON lines
    #[clap(long, global = true)]
    json_logs: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Service configuration file
        #[clap(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Directory of project schema files (overrides the config file)
        #[clap(long)]
        projects_dir: Option<PathBuf>,

        /// Address to bind (overrides the config file)
        #[clap(long)]
        bind: Option<String>,

        /// Port to listen on (overrides the config file)
        #[clap(long)]
        port: Option<u16>,
    },

    /// Check every project schema without contacting the CI server
    Validate {
        /// Directory of project schema files
        #[clap(long, default_value = "./projects")]
        projects_dir: PathBuf,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },

    /// Load and refresh once, then print the catalog
    Inspect {
        /// Service configuration file
        #[clap(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Directory of project schema files (overrides the config file)
        #[clap(long)]
        projects_dir: Option<PathBuf>,

        /// Only show this project
        #[clap(long)]
        project: Option<String>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },
}

fn initialize_tracing(log_level: &LogLevel, json_logs: bool) {
    let filter = EnvFilter::new(log_level.to_filter_directive());

    if json_logs {
        // Logs go to stderr; stdout carries command output
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(
    path: &PathBuf,
    projects_dir: Option<PathBuf>,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if let Some(dir) = projects_dir {
        config.download.projects_dir = dir;
    }
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        Command::Serve {
            config,
            projects_dir,
            bind,
            port,
        } => {
            let config = load_config(&config, projects_dir, bind, port)?;
            info!(
                projects_dir = %config.download.projects_dir.display(),
                refetch_time = config.download.refetch_time,
                "Starting buildlink"
            );
            service::run(config).await
        }
        Command::Validate { projects_dir, json } => {
            projects_cli::validate_command(&projects_dir, json)
        }
        Command::Inspect {
            config,
            projects_dir,
            project,
            json,
        } => {
            let config = load_config(&config, projects_dir, None, None)?;
            projects_cli::inspect_command(config, project.as_deref(), json).await
        }
    }
}
