//! kubectl access to a provisioned cluster
//!
//! Every call is pinned to the handle's kubeconfig and context so the user's
//! default kubeconfig is never consulted or modified.

use crate::error::{Error, Result};
use crate::exec::{CommandOutput, CommandRunner, Invocation};
use crate::provider::ClusterHandle;
use crate::readiness::HealthCheck;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::config::Kubeconfig;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Timeout handed to kubectl for the cluster-info call
const REQUEST_TIMEOUT: &str = "10s";

#[derive(Deserialize)]
struct NodeItems {
    #[serde(default)]
    items: Vec<Node>,
}

/// Name and readiness of one cluster node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub name: String,
    pub ready: bool,
}

impl NodeSummary {
    fn from_node(node: &Node) -> Self {
        let ready = node
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            })
            .unwrap_or(false);

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            ready,
        }
    }
}

#[derive(Clone)]
pub struct Kubectl {
    runner: Arc<dyn CommandRunner>,
    handle: ClusterHandle,
}

impl Kubectl {
    pub fn new(runner: Arc<dyn CommandRunner>, handle: ClusterHandle) -> Self {
        Self { runner, handle }
    }

    pub fn handle(&self) -> &ClusterHandle {
        &self.handle
    }

    /// `kubectl <args> --kubeconfig <file> --context <ctx>`
    pub fn command<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Invocation::new("kubectl")
            .args(args)
            .arg("--kubeconfig")
            .arg(self.handle.kubeconfig.display().to_string())
            .args(["--context", self.handle.context.as_str()])
    }

    pub async fn cluster_info(&self) -> Result<CommandOutput> {
        self.runner
            .run(&self.command([
                "cluster-info".to_string(),
                format!("--request-timeout={}", REQUEST_TIMEOUT),
            ]))
            .await
    }

    /// Make the handle's context current inside its kubeconfig
    ///
    /// Fails when the kubeconfig is unreadable or lacks the context.
    pub async fn bind_context(&self) -> Result<()> {
        let path = &self.handle.kubeconfig;
        let kubeconfig = Kubeconfig::read_from(path).map_err(|e| Error::Kubeconfig {
            path: path.clone(),
            message: e.to_string(),
        })?;

        if !kubeconfig
            .contexts
            .iter()
            .any(|c| c.name == self.handle.context)
        {
            return Err(Error::Kubeconfig {
                path: path.clone(),
                message: format!("context {} not found", self.handle.context),
            });
        }

        self.runner
            .run_checked(&self.command(["config", "use-context", self.handle.context.as_str()]))
            .await?;

        info!(
            cluster = %self.handle.name,
            context = %self.handle.context,
            kubeconfig = %path.display(),
            "Kube context bound"
        );
        Ok(())
    }

    pub async fn nodes(&self) -> Result<Vec<NodeSummary>> {
        let output = self
            .runner
            .run_checked(&self.command(["get", "nodes", "-o", "json"]))
            .await?;
        let list: NodeItems = serde_json::from_str(&output.stdout)?;
        Ok(list.items.iter().map(NodeSummary::from_node).collect())
    }

    /// Check that the cluster registered `expected` nodes
    ///
    /// Nodes that are registered but not yet Ready are only warned about.
    pub async fn verify_nodes(&self, expected: usize) -> Result<Vec<NodeSummary>> {
        let nodes = self.nodes().await?;

        if nodes.len() != expected {
            return Err(Error::provider_call(
                "kubectl get nodes",
                format!("expected {} nodes, found {}", expected, nodes.len()),
            ));
        }

        for node in nodes.iter().filter(|n| !n.ready) {
            warn!(cluster = %self.handle.name, node = %node.name, "Node registered but not Ready yet");
        }

        info!(cluster = %self.handle.name, nodes = nodes.len(), "Nodes verified");
        Ok(nodes)
    }

    /// `kubectl apply -f <url>`
    pub async fn apply_url(&self, url: &str) -> Result<()> {
        self.runner
            .run_checked(&self.command(["apply", "-f", url]))
            .await?;
        Ok(())
    }

    /// `kubectl apply -f -` with `manifest` on stdin
    pub async fn apply_manifest(&self, manifest: &str) -> Result<()> {
        self.runner
            .run_checked(&self.command(["apply", "-f", "-"]).stdin(manifest))
            .await?;
        Ok(())
    }

    /// Wait for a workload rollout to finish
    pub async fn rollout_status(&self, namespace: &str, resource: &str, timeout: &str) -> Result<()> {
        self.runner
            .run_checked(&self.command([
                "rollout".to_string(),
                "status".to_string(),
                resource.to_string(),
                "-n".to_string(),
                namespace.to_string(),
                format!("--timeout={}", timeout),
            ]))
            .await?;
        Ok(())
    }

    /// `kubectl get <resource> -n <ns> -o jsonpath=<path>`, trimmed
    pub async fn get_jsonpath(&self, namespace: &str, resource: &str, path: &str) -> Result<String> {
        let output = self
            .runner
            .run_checked(&self.command([
                "get".to_string(),
                resource.to_string(),
                "-n".to_string(),
                namespace.to_string(),
                format!("-o=jsonpath={}", path),
            ]))
            .await?;
        Ok(output.stdout.trim().to_string())
    }

    /// JSON patch against a namespaced resource
    pub async fn patch_json(&self, namespace: &str, resource: &str, patch: &str) -> Result<()> {
        self.runner
            .run_checked(&self.command([
                "patch", resource, "-n", namespace, "--type=json", "-p", patch,
            ]))
            .await?;
        Ok(())
    }
}

/// Readiness check: a single `kubectl cluster-info`
pub struct ClusterInfoCheck {
    kubectl: Kubectl,
}

impl ClusterInfoCheck {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }
}

#[async_trait]
impl HealthCheck for ClusterInfoCheck {
    fn target(&self) -> &str {
        &self.kubectl.handle().name
    }

    async fn check(&self) -> std::result::Result<(), String> {
        match self.kubectl.cluster_info().await {
            Ok(output) if output.is_success() => Ok(()),
            Ok(output) => Err(output.message()),
            Err(e) => Err(e.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "kubectl_test.rs"]
mod tests;
