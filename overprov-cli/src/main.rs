///! overprov CLI
///!
///! Requests a claim larger than the Ceph cluster and checks what the pod sees

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use overprov_core::logging::LoggingConfig;
use overprov_core::{OverprovConfig, ScenarioError};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long, global = true, env = "OVERPROV_CONFIG")]
    config: Option<PathBuf>,

    /// Kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context
    #[arg(long, global = true)]
    context: Option<String>,

    /// Namespace of the storage operator
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, default_value = "table")]
    output: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the oversized claim check end to end
    Run(StorageArgs),
    /// Print the raw capacity of the Ceph cluster
    Capacity,
    /// Print the manifests a run would submit, without touching the cluster
    Render {
        /// Cluster capacity in GB to plan against
        #[arg(long)]
        capacity_gb: u64,

        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Overrides for the storage section of the configuration
#[derive(Args, Debug, Default)]
pub struct StorageArgs {
    /// Storage interface (CephBlockPool/rbd or CephFileSystem/cephfs)
    #[arg(long)]
    pub interface: Option<String>,

    /// Block pool or filesystem name
    #[arg(long)]
    pub pool: Option<String>,

    /// GB to request beyond the probed capacity
    #[arg(long)]
    pub margin: Option<u64>,

    /// Wait for the claim to bind before creating the pod
    #[arg(long)]
    pub wait_for_bound: bool,

    /// Pod manifest to use instead of the built-in template
    #[arg(long)]
    pub pod_template: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print a sample configuration file
    Sample,
    /// Print the effective configuration
    Show,
    /// Validate the effective configuration
    Validate,
}

impl StorageArgs {
    fn apply(&self, config: &mut OverprovConfig) -> Result<()> {
        if let Some(interface) = &self.interface {
            config.storage.interface = interface.parse()?;
        }
        if let Some(pool) = &self.pool {
            config.storage.interface_name = pool.clone();
        }
        if let Some(margin) = self.margin {
            config.storage.margin_gb = margin;
        }
        if self.wait_for_bound {
            config.storage.wait_for_bound = true;
        }
        if let Some(path) = &self.pod_template {
            config.templates.pod = Some(path.clone());
        }
        Ok(())
    }
}

impl Cli {
    /// Configuration file, environment and flags, in increasing priority
    fn load_config(&self) -> Result<OverprovConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = OverprovConfig::load_from_file(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                config.apply_env_overrides()?;
                config
            }
            None => OverprovConfig::load()?,
        };

        if let Some(path) = &self.kubeconfig {
            config.cluster.kubeconfig = Some(path.clone());
        }
        if let Some(context) = &self.context {
            config.cluster.context = Some(context.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.cluster.namespace = namespace.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        match &self.command {
            Commands::Run(storage) | Commands::Render { storage, .. } => storage.apply(&mut config)?,
            _ => {}
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        let verification_failed = e
            .downcast_ref::<ScenarioError>()
            .map(ScenarioError::is_verification)
            .unwrap_or(false);
        std::process::exit(if verification_failed { 2 } else { 1 });
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    let config = cli.load_config()?;

    let _log_guard = LoggingConfig::from(&config.logging)
        .init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    let format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Run(_) => commands::run::handle_run_command(&config, format).await?,
        Commands::Capacity => commands::capacity::handle_capacity_command(&config, format).await?,
        Commands::Render { capacity_gb, .. } => {
            commands::render::handle_render_command(&config, capacity_gb)?
        }
        Commands::Config { command } => commands::config::handle_config_command(command, &config)?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
