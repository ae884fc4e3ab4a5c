//! Post-provision cluster addons
//!
//! Addons form a closed set. Each installer maps every variant it supports
//! to one idempotent routine; adding an addon means adding a variant and a
//! match arm, nothing else.
//!
//! Installers never wait for an addon to become healthy.

pub mod manifests;
pub mod metallb;
pub mod minikube;
pub mod minio;

use crate::config::{MinioSettings, ProviderKind, Subnet};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::provider::ClusterHandle;
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use manifests::ManifestInstaller;
pub use minikube::MinikubeAddonInstaller;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Addon {
    Ingress,
    IstioProvisioner,
    Istio,
    Metallb,
    MetricsServer,
    Minio,
}

impl Addon {
    pub const ALL: [Addon; 6] = [
        Addon::Ingress,
        Addon::IstioProvisioner,
        Addon::Istio,
        Addon::Metallb,
        Addon::MetricsServer,
        Addon::Minio,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Addon::Ingress => "ingress",
            Addon::IstioProvisioner => "istio-provisioner",
            Addon::Istio => "istio",
            Addon::Metallb => "metallb",
            Addon::MetricsServer => "metrics-server",
            Addon::Minio => "minio",
        }
    }

    /// Addons installed, in order, when none is named
    pub fn defaults_for(provider: ProviderKind) -> &'static [Addon] {
        match provider {
            ProviderKind::Kind => &[Addon::Minio, Addon::Metallb, Addon::MetricsServer],
            ProviderKind::Minikube => &[
                Addon::Ingress,
                Addon::IstioProvisioner,
                Addon::Istio,
                Addon::Metallb,
                Addon::MetricsServer,
            ],
        }
    }
}

impl fmt::Display for Addon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Addon {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Addon::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| Error::UnknownAddon(s.to_string()))
    }
}

/// Inputs addon manifests are rendered from
#[derive(Debug, Clone)]
pub struct AddonContext {
    pub subnet: Subnet,
    pub minio: MinioSettings,
}

/// Applies addons to a running cluster
#[async_trait]
pub trait AddonInstaller: Send + Sync {
    /// Installer name for logging
    fn name(&self) -> &'static str;

    fn supports(&self, addon: Addon) -> bool;

    /// Install one addon. Reinstalling yields the same end state.
    async fn install(&self, addon: Addon, handle: &ClusterHandle) -> Result<()>;
}

/// Build the installer matching the cluster provider
pub fn select_installer(
    provider: ProviderKind,
    runner: Arc<dyn CommandRunner>,
    context: AddonContext,
) -> Box<dyn AddonInstaller> {
    match provider {
        ProviderKind::Kind => Box::new(ManifestInstaller::new(runner, context)),
        ProviderKind::Minikube => Box::new(MinikubeAddonInstaller::new(runner, context)),
    }
}

/// Outcome of installing a list of addons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddonReport {
    pub installed: Vec<Addon>,
    pub failed: Vec<(Addon, String)>,
}

impl AddonReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Install `addons` in order, continuing past individual failures
///
/// An addon whose manifest is rejected is recorded in the report and the
/// sequence moves on. A tool that cannot be executed at all aborts the
/// sequence, since every later addon would fail the same way.
pub async fn install_all(
    installer: &dyn AddonInstaller,
    addons: &[Addon],
    handle: &ClusterHandle,
) -> Result<AddonReport> {
    let mut report = AddonReport::default();

    for &addon in addons {
        info!(cluster = %handle.name, addon = %addon, installer = installer.name(), "Installing addon");

        let result = if installer.supports(addon) {
            installer.install(addon, handle).await
        } else {
            Err(Error::UnsupportedAddon {
                addon: addon.to_string(),
                provider: installer.name().to_string(),
            })
        };

        match result {
            Ok(()) => {
                info!(cluster = %handle.name, addon = %addon, "Addon installed");
                report.installed.push(addon);
            }
            Err(e) if e.is_spawn_failure() => {
                error!(cluster = %handle.name, addon = %addon, error = %e, "Addon tooling unavailable, aborting");
                return Err(e);
            }
            Err(e) => {
                warn!(cluster = %handle.name, addon = %addon, error = %e, "Addon failed, continuing");
                report.failed.push((addon, e.to_string()));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
#[path = "addons_test.rs"]
mod tests;
