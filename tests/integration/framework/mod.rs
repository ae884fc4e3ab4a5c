//! Integration test framework for devcluster
//!
//! Drives the real orchestrator against kind and checks the results with
//! the tools directly:
//! - Cluster, network and node observation
//! - Scenario registration and skipping

#![allow(dead_code)] // Test framework - fields/functions used across different scenarios

pub mod cluster;

use devcluster::config::{Config, ProviderKind, RetrySettings};
use devcluster::exec::SystemRunner;
use devcluster::orchestrator::Orchestrator;
use serde::Deserialize;
use std::sync::Arc;
use tempfile::TempDir;

pub type TestResult = anyhow::Result<()>;

/// Test configuration loaded from config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    pub cluster: ClusterConfig,
    pub readiness: ReadinessConfig,
    pub scenarios: ScenarioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    pub network: String,
    pub subnet: String,
    pub workers: i32,
    pub cleanup: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub lifecycle: bool,
    pub addons: bool,
}

impl TestConfig {
    /// Load configuration from tests/integration/config.toml
    pub fn load() -> anyhow::Result<Self> {
        let config_path = "tests/integration/config.toml";
        let contents = std::fs::read_to_string(config_path)?;
        let config: TestConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// devcluster configuration for the test cluster, rooted in `state_dir`
    pub fn devcluster_config(&self, state_dir: &std::path::Path) -> Config {
        Config {
            name: self.cluster.name.clone(),
            provider: ProviderKind::Kind,
            network: self.cluster.network.clone(),
            subnet: self.cluster.subnet.clone(),
            workers: self.cluster.workers,
            state_dir: Some(state_dir.to_path_buf()),
            retry: RetrySettings {
                attempts: self.readiness.attempts,
                delay_secs: self.readiness.delay_secs,
                ..RetrySettings::default()
            },
            ..Config::default()
        }
    }
}

/// Test context holds shared state across scenarios
pub struct TestContext {
    pub config: TestConfig,
    pub devcluster: Config,
    pub orchestrator: Orchestrator,
    // Dropped last; kubeconfig and descriptor live here
    pub state: TempDir,
}

impl TestContext {
    /// Create the test cluster through the orchestrator
    pub async fn new(config: &TestConfig) -> anyhow::Result<Self> {
        let state = tempfile::tempdir()?;
        let devcluster = config.devcluster_config(state.path());
        let orchestrator = Orchestrator::new(&devcluster, Arc::new(SystemRunner))?;

        println!("🏗️  Creating kind cluster: {}", config.cluster.name);
        let outcome = orchestrator.create(false).await?;
        println!(
            "✅ Cluster ready: {} ({} nodes)",
            outcome.handle.name,
            outcome.nodes.len()
        );

        Ok(Self {
            config: config.clone(),
            devcluster,
            orchestrator,
            state,
        })
    }

    /// Delete the cluster and check nothing is left behind
    pub async fn cleanup(&self) -> TestResult {
        if !self.config.cluster.cleanup {
            println!("♻️  Keeping cluster: {}", self.config.cluster.name);
            return Ok(());
        }

        println!("🗑️  Deleting cluster: {}", self.config.cluster.name);
        self.orchestrator.delete().await?;

        anyhow::ensure!(
            !cluster::kind_cluster_exists(&self.config.cluster.name)?,
            "kind still lists {}",
            self.config.cluster.name
        );
        anyhow::ensure!(
            !cluster::docker_network_exists(&self.config.cluster.network)?,
            "network {} still exists",
            self.config.cluster.network
        );
        Ok(())
    }
}

/// Trait for test scenarios
#[async_trait::async_trait]
pub trait TestScenario: Send + Sync {
    /// Name of the scenario
    fn name(&self) -> &str;

    /// Run the scenario
    async fn run(&self, ctx: &mut TestContext) -> TestResult;

    /// Check if scenario should be skipped
    fn should_skip(&self, config: &TestConfig) -> bool;
}
