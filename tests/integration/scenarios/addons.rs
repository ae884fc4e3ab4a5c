//! Addon scenario - MinIO applied twice converges on one deployment

use crate::integration::framework::{cluster, TestContext, TestResult, TestScenario};
use crate::integration::TestConfig;
use devcluster::addons::Addon;

pub struct MinioAddonScenario;

#[async_trait::async_trait]
impl TestScenario for MinioAddonScenario {
    fn name(&self) -> &str {
        "minio_addon"
    }

    async fn run(&self, ctx: &mut TestContext) -> TestResult {
        let namespace = ctx.devcluster.minio.namespace.clone();

        println!("📦 Installing minio twice...");
        for _ in 0..2 {
            let report = ctx.orchestrator.addons(Some(Addon::Minio)).await?;
            anyhow::ensure!(
                report.installed == vec![Addon::Minio],
                "unexpected report: {:?}",
                report
            );
        }

        let handle = ctx.orchestrator.status().await?.handle;
        let deployments = cluster::kubectl_get(
            &handle.kubeconfig,
            &handle.context,
            &[
                "deployments",
                "-n",
                namespace.as_str(),
                "-o",
                "jsonpath={.items[*].metadata.name}",
            ],
        )?;
        anyhow::ensure!(
            deployments.split_whitespace().collect::<Vec<_>>() == vec!["minio"],
            "expected exactly one minio deployment, found {:?}",
            deployments
        );

        Ok(())
    }

    fn should_skip(&self, config: &TestConfig) -> bool {
        !config.scenarios.addons
    }
}
