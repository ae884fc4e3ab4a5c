//! Addons bundled with minikube

use super::{Addon, AddonContext, AddonInstaller, ManifestInstaller};
use crate::error::Result;
use crate::exec::{CommandRunner, Invocation};
use crate::kubectl::Kubectl;
use crate::provider::ClusterHandle;
use async_trait::async_trait;
use std::sync::Arc;

/// Enables minikube's bundled addons; MinIO falls back to manifests
pub struct MinikubeAddonInstaller {
    runner: Arc<dyn CommandRunner>,
    manifests: ManifestInstaller,
}

impl MinikubeAddonInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>, context: AddonContext) -> Self {
        Self {
            manifests: ManifestInstaller::new(runner.clone(), context),
            runner,
        }
    }
}

#[async_trait]
impl AddonInstaller for MinikubeAddonInstaller {
    fn name(&self) -> &'static str {
        "minikube"
    }

    fn supports(&self, _addon: Addon) -> bool {
        true
    }

    async fn install(&self, addon: Addon, handle: &ClusterHandle) -> Result<()> {
        if addon == Addon::Minio {
            let kubectl = Kubectl::new(self.runner.clone(), handle.clone());
            return self.manifests.install_minio(&kubectl).await;
        }

        // Enabling an enabled addon is a no-op for minikube
        let enable = Invocation::new("minikube")
            .args(["addons", "enable", addon.as_str(), "-p", handle.name.as_str()])
            .env("KUBECONFIG", handle.kubeconfig.display().to_string());
        self.runner.run_checked(&enable).await?;
        Ok(())
    }
}
