//! Docker network management for kind clusters

use crate::config::Subnet;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, Invocation};
use std::sync::Arc;
use tracing::{debug, info};

/// Go template listing every IPAM subnet of a network
const SUBNET_FORMAT: &str = "{{range .IPAM.Config}}{{.Subnet}} {{end}}";

/// A user-defined Docker bridge network
pub struct DockerNetwork {
    runner: Arc<dyn CommandRunner>,
}

impl DockerNetwork {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&Invocation::new("docker").args(["network", "inspect", name]))
            .await?;
        Ok(output.is_success())
    }

    /// Subnets of an existing network, `None` when it is absent
    async fn subnets(&self, name: &str) -> Result<Option<Vec<String>>> {
        let output = self
            .runner
            .run(&Invocation::new("docker").args([
                "network",
                "inspect",
                "-f",
                SUBNET_FORMAT,
                name,
            ]))
            .await?;
        if !output.is_success() {
            return Ok(None);
        }
        Ok(Some(
            output
                .stdout
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        ))
    }

    /// Create the network unless it already exists
    ///
    /// An existing network is only reused when it carries `subnet`.
    pub async fn ensure(&self, name: &str, subnet: &Subnet) -> Result<()> {
        if let Some(existing) = self.subnets(name).await? {
            if !existing
                .iter()
                .any(|s| s.parse::<Subnet>().ok().as_ref() == Some(subnet))
            {
                return Err(Error::config(format!(
                    "Docker network {} exists with subnet {}, expected {}",
                    name,
                    if existing.is_empty() {
                        "none".to_string()
                    } else {
                        existing.join(",")
                    },
                    subnet
                )));
            }
            info!(network = name, subnet = %subnet, "Reusing existing Docker network");
            return Ok(());
        }

        info!(network = name, subnet = %subnet, "Creating Docker network");
        self.runner
            .run_checked(&Invocation::new("docker").args([
                "network".to_string(),
                "create".to_string(),
                "--driver".to_string(),
                "bridge".to_string(),
                "--subnet".to_string(),
                subnet.to_string(),
                name.to_string(),
            ]))
            .await?;
        Ok(())
    }

    /// Remove the network; absent networks are skipped
    pub async fn remove(&self, name: &str) -> Result<()> {
        if !self.exists(name).await? {
            debug!(network = name, "Docker network already absent");
            return Ok(());
        }

        info!(network = name, "Removing Docker network");
        self.runner
            .run_checked(&Invocation::new("docker").args(["network", "rm", name]))
            .await?;
        Ok(())
    }
}
