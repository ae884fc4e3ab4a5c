//! Direct observation of kind clusters, bypassing the orchestrator

use anyhow::{bail, Context};
use std::path::Path;
use std::process::Command;

fn stdout(command: &mut Command) -> anyhow::Result<String> {
    let output = command
        .output()
        .with_context(|| format!("failed to run {:?}", command))?;
    if !output.status.success() {
        bail!(
            "{:?} failed: {}",
            command,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8(output.stdout)?)
}

/// Check if kind cluster exists
pub fn kind_cluster_exists(name: &str) -> anyhow::Result<bool> {
    let clusters = stdout(Command::new("kind").args(["get", "clusters"]))?;
    Ok(clusters.lines().any(|line| line.trim() == name))
}

pub fn docker_network_exists(name: &str) -> anyhow::Result<bool> {
    let status = Command::new("docker")
        .args(["network", "inspect", name])
        .output()?
        .status;
    Ok(status.success())
}

/// `kubectl get <args>` pinned to the test kubeconfig
pub fn kubectl_get(kubeconfig: &Path, context: &str, args: &[&str]) -> anyhow::Result<String> {
    stdout(
        Command::new("kubectl")
            .arg("get")
            .args(args)
            .arg("--kubeconfig")
            .arg(kubeconfig)
            .args(["--context", context]),
    )
}

/// Names of the cluster's nodes
pub fn node_names(kubeconfig: &Path, context: &str) -> anyhow::Result<Vec<String>> {
    let names = kubectl_get(
        kubeconfig,
        context,
        &["nodes", "-o", "jsonpath={.items[*].metadata.name}"],
    )?;
    Ok(names.split_whitespace().map(str::to_string).collect())
}

/// Current context recorded in a kubeconfig file
pub fn current_context(kubeconfig: &Path) -> anyhow::Result<String> {
    let config = kube::config::Kubeconfig::read_from(kubeconfig)?;
    config
        .current_context
        .context("kubeconfig has no current context")
}
