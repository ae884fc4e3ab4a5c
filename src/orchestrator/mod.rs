//! Cluster lifecycle orchestration
//!
//! Sequences the provider, readiness poller, kubectl and addon installer
//! for each user-facing command. Steps run strictly one after another and
//! the first failure aborts the rest; nothing is rolled back.
//!
//! Two orchestrations against the same cluster name must not run at the
//! same time. No lock enforces this. An interrupted `create` can leave a
//! partial cluster or network behind; `delete` cleans both up.

use crate::addons::{self, select_installer, Addon, AddonContext, AddonInstaller, AddonReport};
use crate::config::{ClusterSpec, Config};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::kubectl::{ClusterInfoCheck, Kubectl, NodeSummary};
use crate::platform;
use crate::provider::{select_provider, ClusterHandle, ClusterProvider};
use crate::readiness::{await_ready, HealthCheck, Readiness, RetryBudget};
use crate::state::StateDir;
use crate::topology;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a successful `create`
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    pub handle: ClusterHandle,
    pub nodes: Vec<NodeSummary>,
    /// Present when addons were requested
    pub addons: Option<AddonReport>,
}

/// Result of `delete`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Whether the provider still knew the cluster
    pub existed: bool,
    /// Local artifacts that were removed
    pub removed: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatus {
    pub handle: ClusterHandle,
    pub exists: bool,
    /// API server answered a single cluster-info call
    pub reachable: bool,
}

pub struct Orchestrator {
    spec: ClusterSpec,
    budget: RetryBudget,
    state: StateDir,
    runner: Arc<dyn CommandRunner>,
    provider: Box<dyn ClusterProvider>,
    installer: Box<dyn AddonInstaller>,
    host: (String, String),
}

impl Orchestrator {
    /// Wire the provider and addon installer selected by `config`
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        let spec = config.cluster_spec()?;
        let state = StateDir::new(config.state_dir());
        let provider = select_provider(config.provider, runner.clone(), state.clone());
        let installer = select_installer(
            config.provider,
            runner.clone(),
            AddonContext {
                subnet: spec.subnet,
                minio: config.minio.clone(),
            },
        );

        Ok(Self {
            spec,
            budget: config.retry_budget(),
            state,
            runner,
            provider,
            installer,
            host: (
                std::env::consts::OS.to_string(),
                std::env::consts::ARCH.to_string(),
            ),
        })
    }

    /// Override the detected host platform
    pub fn with_platform(mut self, os: &str, arch: &str) -> Self {
        self.host = (os.to_string(), arch.to_string());
        self
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn kubectl(&self, handle: ClusterHandle) -> Kubectl {
        Kubectl::new(self.runner.clone(), handle)
    }

    /// Provision the cluster and leave it ready for kubectl
    ///
    /// Render, create, poll, bind the context, verify nodes and optionally
    /// install the default addons. A readiness timeout exports provider
    /// logs once before failing.
    pub async fn create(&self, with_addons: bool) -> Result<CreateOutcome> {
        platform::check_platform(&self.host.0, &self.host.1)?;
        let descriptor = topology::render(&self.spec)?;
        platform::check_prerequisites(self.runner.as_ref(), self.provider.kind()).await?;

        self.state.ensure()?;
        self.provider.prepare_network(&self.spec).await?;

        info!(
            cluster = %self.name(),
            provider = %self.provider.kind(),
            nodes = descriptor.node_count(),
            "Creating cluster"
        );
        let handle = self.provider.create(&self.spec, &descriptor).await?;

        let kubectl = self.kubectl(handle.clone());
        let check = ClusterInfoCheck::new(kubectl.clone());
        let readiness = await_ready(&check, &self.budget).await;
        if let Readiness::TimedOut {
            attempts,
            last_error,
        } = readiness
        {
            warn!(
                cluster = %self.name(),
                attempts = attempts,
                last_error = %last_error,
                "Cluster never became ready"
            );
            self.export_logs().await;
            return Err(Error::ReadinessTimeout {
                cluster: self.name().to_string(),
                attempts,
            });
        }

        info!(cluster = %self.name(), attempts = readiness.attempts(), "API server answered");

        kubectl.bind_context().await?;
        let nodes = kubectl.verify_nodes(descriptor.node_count()).await?;

        let addons = if with_addons {
            Some(
                addons::install_all(
                    self.installer.as_ref(),
                    Addon::defaults_for(self.provider.kind()),
                    &handle,
                )
                .await?,
            )
        } else {
            None
        };

        info!(cluster = %self.name(), context = %handle.context, "Cluster created");
        Ok(CreateOutcome {
            handle,
            nodes,
            addons,
        })
    }

    /// Best-effort diagnostic dump; failures are only logged
    async fn export_logs(&self) {
        let dir = self.state.log_dir(self.name(), Utc::now());
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Cannot create log directory");
            return;
        }
        match self.provider.export_logs(self.name(), &dir).await {
            Ok(()) => info!(cluster = %self.name(), dir = %dir.display(), "Provider logs exported"),
            Err(e) => warn!(cluster = %self.name(), error = %e, "Log export failed"),
        }
    }

    /// Delete the cluster, its network and local artifacts
    ///
    /// A cluster the provider does not know, or cannot look up, is skipped,
    /// but the network and local files are still cleaned up. Addons are not
    /// uninstalled individually; they go away with the cluster.
    pub async fn delete(&self) -> Result<DeleteOutcome> {
        let existed = match self.provider.exists(self.name()).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(
                    cluster = %self.name(),
                    error = %e,
                    "Cluster lookup failed, treating it as absent"
                );
                false
            }
        };

        if existed {
            self.provider.delete(self.name()).await?;
        } else {
            info!(cluster = %self.name(), "Cluster not found, skipping provider delete");
        }

        self.provider.release_network(&self.spec).await?;
        let removed = self.state.remove_artifacts(self.name())?;

        info!(cluster = %self.name(), existed = existed, "Cluster deleted");
        Ok(DeleteOutcome { existed, removed })
    }

    pub async fn start(&self) -> Result<()> {
        self.provider.start(self.name()).await?;
        info!(cluster = %self.name(), "Cluster started");
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.provider.stop(self.name()).await?;
        info!(cluster = %self.name(), "Cluster stopped");
        Ok(())
    }

    /// Install one addon, or the provider's default list
    ///
    /// The cluster must exist and its API must answer before anything is
    /// applied. A single named addon that fails is an error. The default
    /// list keeps going past individual failures and reports them.
    pub async fn addons(&self, addon: Option<Addon>) -> Result<AddonReport> {
        if let Some(addon) = addon {
            if !self.installer.supports(addon) {
                return Err(Error::UnsupportedAddon {
                    addon: addon.to_string(),
                    provider: self.provider.kind().to_string(),
                });
            }
        }

        let handle = self.reachable_handle().await?;

        match addon {
            Some(addon) => {
                self.installer.install(addon, &handle).await?;
                info!(cluster = %self.name(), addon = %addon, "Addon installed");
                Ok(AddonReport {
                    installed: vec![addon],
                    failed: Vec::new(),
                })
            }
            None => {
                addons::install_all(
                    self.installer.as_ref(),
                    Addon::defaults_for(self.provider.kind()),
                    &handle,
                )
                .await
            }
        }
    }

    /// Handle of an existing cluster whose API answers a cluster-info call
    async fn reachable_handle(&self) -> Result<ClusterHandle> {
        if !self.provider.exists(self.name()).await? {
            return Err(Error::ClusterNotFound(self.name().to_string()));
        }

        let handle = self.provider.handle(self.name());
        ClusterInfoCheck::new(self.kubectl(handle.clone()))
            .check()
            .await
            .map_err(|message| Error::provider_call("kubectl cluster-info", message))?;
        Ok(handle)
    }

    /// Whether the cluster exists and its API answers
    pub async fn status(&self) -> Result<ClusterStatus> {
        let handle = self.provider.handle(self.name());
        let exists = self.provider.exists(self.name()).await?;

        let reachable = if exists {
            ClusterInfoCheck::new(self.kubectl(handle.clone()))
                .check()
                .await
                .is_ok()
        } else {
            false
        };

        Ok(ClusterStatus {
            handle,
            exists,
            reachable,
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
