//! Lifecycle scenario - topology, context binding and stop/start

use crate::integration::framework::{cluster, TestContext, TestResult, TestScenario};
use crate::integration::TestConfig;

pub struct StopStartScenario;

#[async_trait::async_trait]
impl TestScenario for StopStartScenario {
    fn name(&self) -> &str {
        "stop_start"
    }

    async fn run(&self, ctx: &mut TestContext) -> TestResult {
        let status = ctx.orchestrator.status().await?;
        let handle = status.handle;

        // Step 1: Created cluster matches the requested topology
        println!("🔍 Step 1: Checking nodes and context...");
        let nodes = cluster::node_names(&handle.kubeconfig, &handle.context)?;
        let expected = 1 + ctx.config.cluster.workers as usize;
        anyhow::ensure!(
            nodes.len() == expected,
            "expected {} nodes, found {:?}",
            expected,
            nodes
        );
        anyhow::ensure!(
            cluster::current_context(&handle.kubeconfig)? == handle.context,
            "context {} was not bound",
            handle.context
        );
        anyhow::ensure!(status.reachable, "API server not reachable after create");

        // Step 2: Stop takes the API down
        println!("\n⏸️  Step 2: Stopping cluster...");
        ctx.orchestrator.stop().await?;
        let stopped = ctx.orchestrator.status().await?;
        anyhow::ensure!(stopped.exists, "stopped cluster should still exist");
        anyhow::ensure!(!stopped.reachable, "stopped cluster still answers");

        // Step 3: Start brings it back; kind needs a moment after docker start
        println!("\n▶️  Step 3: Starting cluster...");
        ctx.orchestrator.start().await?;
        let mut reachable = false;
        for _ in 0..ctx.config.readiness.attempts {
            if ctx.orchestrator.status().await?.reachable {
                reachable = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_secs(ctx.config.readiness.delay_secs))
                .await;
        }
        anyhow::ensure!(reachable, "cluster did not come back after start");

        Ok(())
    }

    fn should_skip(&self, config: &TestConfig) -> bool {
        !config.scenarios.lifecycle
    }
}
