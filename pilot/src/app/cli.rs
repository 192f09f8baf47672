use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::deployment::{Backend, Environment};

/// deploy-pilot - deployment automation for PaaS, Docker Compose and VPS targets
#[derive(Parser, Debug)]
#[command(name = "deploy-pilot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project directory holding compose files and deployment scripts
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deployment operations
    #[command(subcommand)]
    Deploy(DeployCommand),

    /// Monitor deployments
    #[command(subcommand)]
    Monitor(MonitorCommand),

    /// HTTP checks of a deployed application
    #[command(subcommand)]
    Web(WebCommand),

    /// Backup and restore deployment files
    #[command(subcommand)]
    File(FileCommand),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum DeployCommand {
    /// Deploy through the PaaS API
    #[command(alias = "coolify")]
    Paas {
        #[arg(long, value_enum, default_value = "production")]
        environment: Environment,

        /// Project name (defaults to coolify.project_name)
        #[arg(long)]
        project: Option<String>,

        /// Force deployment
        #[arg(long)]
        force: bool,
    },

    /// Deploy Docker containers with Docker Compose
    #[command(alias = "docker")]
    Compose {
        /// Compose file (defaults to the environment's configured file)
        #[arg(long)]
        compose_file: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "production")]
        environment: Environment,

        /// Build images before deployment
        #[arg(long)]
        build: bool,

        /// Stop running containers first
        #[arg(long)]
        restart: bool,
    },

    /// Deploy to a VPS with the provider's deployment script
    Vps {
        #[arg(long, default_value = "vultr", value_parser = ["vultr", "digitalocean", "aws", "custom"])]
        provider: String,

        #[arg(long, value_enum, default_value = "production")]
        environment: Environment,

        /// Target server IP
        #[arg(long)]
        server_ip: Option<String>,

        /// SSH key path
        #[arg(long)]
        ssh_key: Option<PathBuf>,
    },
}

/// Backend selection for monitoring commands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendArg {
    Paas,
    Compose,
    Vps,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Paas => Backend::Paas,
            BackendArg::Compose => Backend::Compose,
            BackendArg::Vps => Backend::Vps,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum MonitorCommand {
    /// Check deployment status
    Status {
        /// Backend to query (detected from the project when omitted)
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        /// Specific deployment id
        #[arg(long)]
        deployment_id: Option<String>,

        /// Keep polling until the deployment finishes
        #[arg(long)]
        watch: bool,
    },

    /// View deployment logs
    Logs {
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,

        #[arg(long)]
        deployment_id: Option<String>,

        /// Number of lines to show
        #[arg(long, default_value_t = 50)]
        tail: u32,

        /// Follow log output
        #[arg(short, long)]
        follow: bool,
    },

    /// Health check a deployed application
    Health {
        /// Application URL (defaults to the configured health check URL)
        #[arg(long)]
        url: Option<String>,

        #[arg(long, value_enum, default_value = "production")]
        environment: Environment,

        /// Timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum WebCommand {
    /// Smoke test a deployed application
    Test {
        /// Application URL
        #[arg(long)]
        url: String,

        /// Probe the health endpoints
        #[arg(long)]
        health_check: bool,

        /// Run a short sequential load test
        #[arg(long)]
        load_test: bool,

        /// Load test duration in seconds
        #[arg(long, default_value_t = 10)]
        duration: u64,
    },
}

#[derive(Subcommand, Debug)]
pub enum FileCommand {
    /// Backup deployment files
    Backup {
        /// Include configuration files
        #[arg(long)]
        config_files: bool,

        /// Include the application logs
        #[arg(long)]
        logs: bool,

        /// Include the database
        #[arg(long)]
        database: bool,

        /// Backup destination directory
        #[arg(long)]
        destination: Option<PathBuf>,
    },

    /// Restore from a backup
    Restore {
        /// Backup directory
        #[arg(long)]
        backup_path: PathBuf,

        #[arg(long)]
        config_files: bool,

        #[arg(long)]
        logs: bool,

        #[arg(long)]
        database: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get a configuration value, or the whole document without a key
    Get {
        #[arg(long)]
        key: Option<String>,
    },

    /// Set a configuration value
    Set {
        #[arg(long)]
        key: String,

        /// JSON value, or a plain string
        #[arg(long)]
        value: String,
    },
}
