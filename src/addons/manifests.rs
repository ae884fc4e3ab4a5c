//! Addons applied as Kubernetes manifests through kubectl
//!
//! Used for kind clusters, and for MinIO on minikube, which has no bundled
//! equivalent. Every routine is a sequence of `kubectl apply` calls, so a
//! rerun converges on the same objects.

use super::{metallb, minio, Addon, AddonContext, AddonInstaller};
use crate::error::{Error, Result};
use crate::exec::CommandRunner;
use crate::kubectl::Kubectl;
use crate::provider::ClusterHandle;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub const METALLB_MANIFEST: &str =
    "https://raw.githubusercontent.com/metallb/metallb/v0.14.5/config/manifests/metallb-native.yaml";
pub const METRICS_SERVER_MANIFEST: &str =
    "https://github.com/kubernetes-sigs/metrics-server/releases/download/v0.7.1/components.yaml";
pub const INGRESS_NGINX_MANIFEST: &str = "https://raw.githubusercontent.com/kubernetes/ingress-nginx/controller-v1.10.1/deploy/static/provider/kind/deploy.yaml";

/// MetalLB's webhook must be serving before pools can be created
const METALLB_ROLLOUT_TIMEOUT: &str = "120s";

const METRICS_SERVER_NAMESPACE: &str = "kube-system";
const METRICS_SERVER_DEPLOYMENT: &str = "deployment/metrics-server";

/// kind kubelets serve self-signed certificates
const INSECURE_TLS_FLAG: &str = "--kubelet-insecure-tls";

pub struct ManifestInstaller {
    runner: Arc<dyn CommandRunner>,
    context: AddonContext,
}

impl ManifestInstaller {
    pub fn new(runner: Arc<dyn CommandRunner>, context: AddonContext) -> Self {
        Self { runner, context }
    }

    fn kubectl(&self, handle: &ClusterHandle) -> Kubectl {
        Kubectl::new(self.runner.clone(), handle.clone())
    }

    pub(crate) async fn install_minio(&self, kubectl: &Kubectl) -> Result<()> {
        let manifest = minio::manifest(&self.context.minio)?;
        kubectl.apply_manifest(&manifest).await
    }

    async fn install_metallb(&self, kubectl: &Kubectl) -> Result<()> {
        // Render first so a bad subnet fails before anything is applied
        let pool = metallb::pool_manifest(&self.context.subnet)?;

        kubectl.apply_url(METALLB_MANIFEST).await?;
        kubectl
            .rollout_status(
                metallb::NAMESPACE,
                "deployment/controller",
                METALLB_ROLLOUT_TIMEOUT,
            )
            .await?;
        kubectl.apply_manifest(&pool).await?;

        info!(
            cluster = %kubectl.handle().name,
            range = %metallb::address_range(&self.context.subnet)?,
            "MetalLB address pool configured"
        );
        Ok(())
    }

    async fn install_metrics_server(&self, kubectl: &Kubectl) -> Result<()> {
        kubectl.apply_url(METRICS_SERVER_MANIFEST).await?;

        let args = kubectl
            .get_jsonpath(
                METRICS_SERVER_NAMESPACE,
                METRICS_SERVER_DEPLOYMENT,
                "{.spec.template.spec.containers[0].args}",
            )
            .await?;

        if args.contains(INSECURE_TLS_FLAG) {
            debug!(cluster = %kubectl.handle().name, "metrics-server already patched");
            return Ok(());
        }

        let patch = serde_json::json!([{
            "op": "add",
            "path": "/spec/template/spec/containers/0/args/-",
            "value": INSECURE_TLS_FLAG,
        }]);
        kubectl
            .patch_json(
                METRICS_SERVER_NAMESPACE,
                METRICS_SERVER_DEPLOYMENT,
                &patch.to_string(),
            )
            .await
    }
}

#[async_trait]
impl AddonInstaller for ManifestInstaller {
    fn name(&self) -> &'static str {
        "kind"
    }

    fn supports(&self, addon: Addon) -> bool {
        matches!(
            addon,
            Addon::Minio | Addon::Metallb | Addon::MetricsServer | Addon::Ingress
        )
    }

    async fn install(&self, addon: Addon, handle: &ClusterHandle) -> Result<()> {
        let kubectl = self.kubectl(handle);

        match addon {
            Addon::Minio => self.install_minio(&kubectl).await,
            Addon::Metallb => self.install_metallb(&kubectl).await,
            Addon::MetricsServer => self.install_metrics_server(&kubectl).await,
            Addon::Ingress => kubectl.apply_url(INGRESS_NGINX_MANIFEST).await,
            Addon::Istio | Addon::IstioProvisioner => Err(Error::UnsupportedAddon {
                addon: addon.to_string(),
                provider: self.name().to_string(),
            }),
        }
    }
}
