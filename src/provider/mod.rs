//! Cluster providers
//!
//! A provider wraps one local-cluster CLI. The orchestrator only ever talks
//! to the [`ClusterProvider`] trait and trusts nothing but exit status:
//! - KindProvider: one Docker container per node, custom Docker network
//! - MinikubeProvider: one minikube profile with N nodes

pub mod docker;
pub mod kind;
pub mod minikube;

use crate::config::{ClusterSpec, ProviderKind};
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::state::StateDir;
use crate::topology::Descriptor;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use docker::DockerNetwork;
pub use kind::KindProvider;
pub use minikube::MinikubeProvider;

/// Identity of a provisioned cluster
///
/// Everything needed to address it with kubectl: the cluster name, the
/// kube-context the provider assigned and the kubeconfig that holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHandle {
    pub name: String,
    pub context: String,
    pub kubeconfig: PathBuf,
}

/// Lifecycle operations backed by an external cluster tool
///
/// Implementations must be safe to call repeatedly for the same name, with
/// the exception of `create`, which is never retried.
#[async_trait]
pub trait ClusterProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Handle the cluster `name` has (or would have) with this provider
    fn handle(&self, name: &str) -> ClusterHandle;

    /// Whether the provider knows a cluster called `name`
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Create any network the cluster will be attached to
    async fn prepare_network(&self, _spec: &ClusterSpec) -> Result<()> {
        Ok(())
    }

    /// Remove the network created by `prepare_network`, if any
    async fn release_network(&self, _spec: &ClusterSpec) -> Result<()> {
        Ok(())
    }

    /// Provision the cluster. Blocks until the provider returns.
    async fn create(&self, spec: &ClusterSpec, descriptor: &Descriptor) -> Result<ClusterHandle>;

    async fn delete(&self, name: &str) -> Result<()>;

    async fn start(&self, name: &str) -> Result<()>;

    async fn stop(&self, name: &str) -> Result<()>;

    /// Dump provider diagnostics into `dir`
    async fn export_logs(&self, name: &str, dir: &Path) -> Result<()>;
}

/// Build the provider for `kind`
///
/// # Example
/// ```ignore
/// let provider = select_provider(ProviderKind::Kind, runner, state);
/// provider.create(&spec, &descriptor).await?;
/// ```
pub fn select_provider(
    kind: ProviderKind,
    runner: Arc<dyn CommandRunner>,
    state: StateDir,
) -> Box<dyn ClusterProvider> {
    match kind {
        ProviderKind::Kind => Box::new(KindProvider::new(runner, state)),
        ProviderKind::Minikube => Box::new(MinikubeProvider::new(runner, state)),
    }
}
