//! Command line surface

use crate::addons::{Addon, AddonReport};
use crate::config::{Config, ProviderKind, CONFIG_ENV};
use crate::error::Result;
use crate::exec::{CommandRunner, SystemRunner};
use crate::orchestrator::Orchestrator;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// devcluster - local Kubernetes clusters for development
#[derive(Parser, Debug)]
#[command(name = "devcluster")]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Cluster tool to drive
    #[arg(long, global = true, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Cluster name
    #[arg(long, global = true)]
    pub name: Option<String>,

    /// Directory for kubeconfigs, descriptors and log dumps
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the cluster and wait until its API answers
    Create(CreateArgs),
    /// Delete the cluster, its network and local files
    Delete,
    /// Start a stopped cluster
    Start,
    /// Stop a running cluster
    Stop,
    /// Install one addon, or the provider's default set
    Addons {
        /// ingress, istio-provisioner, istio, metallb, metrics-server or minio
        name: Option<String>,
    },
    /// Show whether the cluster exists and answers
    Status,
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Worker nodes besides the control plane
    #[arg(long, allow_negative_numbers = true)]
    pub workers: Option<i32>,

    /// kind node image
    #[arg(long)]
    pub node_image: Option<String>,

    /// Kubernetes version for minikube
    #[arg(long)]
    pub kubernetes_version: Option<String>,

    /// Docker network subnet (CIDR)
    #[arg(long)]
    pub subnet: Option<String>,

    /// Install the default addons once the cluster is ready
    #[arg(long)]
    pub with_addons: bool,
}

impl Cli {
    /// Layer command line flags over the loaded configuration
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir = Some(dir.clone());
        }
        if let Commands::Create(args) = &self.command {
            if let Some(workers) = args.workers {
                config.workers = workers;
            }
            if let Some(image) = &args.node_image {
                config.node_image = image.clone();
            }
            if let Some(version) = &args.kubernetes_version {
                config.kubernetes_version = version.clone();
            }
            if let Some(subnet) = &args.subnet {
                config.subnet = subnet.clone();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Run the command against the host's tools
    pub async fn run(self) -> Result<()> {
        self.run_with(Arc::new(SystemRunner)).await
    }

    pub async fn run_with(self, runner: Arc<dyn CommandRunner>) -> Result<()> {
        // Addon names are checked before anything else touches the host
        let addon = match &self.command {
            Commands::Addons { name: Some(name) } => Some(name.parse::<Addon>()?),
            _ => None,
        };

        let config = self.resolve_config()?;
        let orchestrator = Orchestrator::new(&config, runner)?;

        match self.command {
            Commands::Create(args) => {
                let outcome = orchestrator.create(args.with_addons).await?;
                println!(
                    "Cluster {} is ready ({} nodes, context {})",
                    outcome.handle.name,
                    outcome.nodes.len(),
                    outcome.handle.context
                );
                println!("kubeconfig: {}", outcome.handle.kubeconfig.display());
                if let Some(report) = &outcome.addons {
                    print_report(report);
                }
            }
            Commands::Delete => {
                let outcome = orchestrator.delete().await?;
                if outcome.existed {
                    println!("Cluster {} deleted", config.name);
                } else {
                    println!("Cluster {} not found, local state cleaned up", config.name);
                }
            }
            Commands::Start => {
                orchestrator.start().await?;
                println!("Cluster {} started", config.name);
            }
            Commands::Stop => {
                orchestrator.stop().await?;
                println!("Cluster {} stopped", config.name);
            }
            Commands::Addons { .. } => {
                let report = orchestrator.addons(addon).await?;
                print_report(&report);
            }
            Commands::Status => {
                let status = orchestrator.status().await?;
                let state = match (status.exists, status.reachable) {
                    (false, _) => "absent",
                    (true, false) => "unreachable",
                    (true, true) => "running",
                };
                println!(
                    "{}\t{}\t{}\t{}",
                    status.handle.name,
                    config.provider,
                    state,
                    status.handle.context
                );
            }
        }

        Ok(())
    }
}

fn print_report(report: &AddonReport) {
    for addon in &report.installed {
        println!("addon {}: installed", addon);
    }
    for (addon, reason) in &report.failed {
        eprintln!("addon {}: failed: {}", addon, reason);
    }
}
