//! kind provider
//!
//! Nodes are Docker containers attached to a dedicated network, selected
//! through `KIND_EXPERIMENTAL_DOCKER_NETWORK`. kind has no start/stop verbs,
//! so those act on the node containers directly.

use super::{ClusterHandle, ClusterProvider, DockerNetwork};
use crate::config::{ClusterSpec, ProviderKind};
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, Invocation};
use crate::state::StateDir;
use crate::topology::Descriptor;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Environment variable kind reads to pick the Docker network
pub const KIND_NETWORK_ENV: &str = "KIND_EXPERIMENTAL_DOCKER_NETWORK";

pub struct KindProvider {
    runner: Arc<dyn CommandRunner>,
    state: StateDir,
    network: DockerNetwork,
}

impl KindProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, state: StateDir) -> Self {
        let network = DockerNetwork::new(runner.clone());
        Self {
            runner,
            state,
            network,
        }
    }

    /// Container names of the cluster's nodes
    async fn node_containers(&self, name: &str) -> Result<Vec<String>> {
        let output = self
            .runner
            .run_checked(&Invocation::new("kind").args(["get", "nodes", "--name", name]))
            .await?;

        let nodes: Vec<String> = output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with("No kind nodes"))
            .map(str::to_string)
            .collect();

        if nodes.is_empty() {
            return Err(Error::ClusterNotFound(name.to_string()));
        }
        Ok(nodes)
    }

    async fn docker_on_nodes(&self, verb: &str, name: &str) -> Result<()> {
        let nodes = self.node_containers(name).await?;
        info!(cluster = name, nodes = nodes.len(), verb = verb, "Updating kind node containers");
        self.runner
            .run_checked(&Invocation::new("docker").arg(verb).args(nodes))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterProvider for KindProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Kind
    }

    fn handle(&self, name: &str) -> ClusterHandle {
        ClusterHandle {
            name: name.to_string(),
            context: format!("kind-{}", name),
            kubeconfig: self.state.kubeconfig_path(name),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let output = self
            .runner
            .run_checked(&Invocation::new("kind").args(["get", "clusters"]))
            .await?;
        Ok(output.stdout.lines().any(|line| line.trim() == name))
    }

    async fn prepare_network(&self, spec: &ClusterSpec) -> Result<()> {
        self.network.ensure(&spec.network, &spec.subnet).await
    }

    async fn release_network(&self, spec: &ClusterSpec) -> Result<()> {
        self.network.remove(&spec.network).await
    }

    async fn create(&self, spec: &ClusterSpec, descriptor: &Descriptor) -> Result<ClusterHandle> {
        let config_path = self
            .state
            .write_descriptor(&spec.name, &descriptor.to_yaml()?)?;
        let handle = self.handle(&spec.name);

        info!(
            cluster = %spec.name,
            nodes = descriptor.node_count(),
            image = %spec.node_image,
            network = %spec.network,
            "Creating kind cluster"
        );

        self.runner
            .run_checked(
                &Invocation::new("kind")
                    .args(["create", "cluster", "--name", spec.name.as_str()])
                    .arg("--config")
                    .arg(config_path.display().to_string())
                    .args(["--image", spec.node_image.as_str()])
                    .arg("--kubeconfig")
                    .arg(handle.kubeconfig.display().to_string())
                    .env(KIND_NETWORK_ENV, &spec.network),
            )
            .await?;

        Ok(handle)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        info!(cluster = name, "Deleting kind cluster");
        self.runner
            .run_checked(&Invocation::new("kind").args(["delete", "cluster", "--name", name]))
            .await?;
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<()> {
        self.docker_on_nodes("start", name).await
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.docker_on_nodes("stop", name).await
    }

    async fn export_logs(&self, name: &str, dir: &Path) -> Result<()> {
        info!(cluster = name, dir = %dir.display(), "Exporting kind logs");
        self.runner
            .run_checked(
                &Invocation::new("kind")
                    .args(["export", "logs"])
                    .arg(dir.display().to_string())
                    .args(["--name", name]),
            )
            .await?;
        Ok(())
    }
}
