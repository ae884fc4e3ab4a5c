//! minikube provider
//!
//! One minikube profile per cluster. minikube writes its context into
//! whatever `KUBECONFIG` points at, so every call that touches contexts
//! runs with `KUBECONFIG` set to the cluster's own file.

use super::{ClusterHandle, ClusterProvider};
use crate::config::{ClusterSpec, ProviderKind};
use crate::error::Result;
use crate::exec::{CommandRunner, Invocation};
use crate::state::StateDir;
use crate::topology::Descriptor;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub struct MinikubeProvider {
    runner: Arc<dyn CommandRunner>,
    state: StateDir,
}

#[derive(Debug, Default, Deserialize)]
struct ProfileList {
    #[serde(default)]
    valid: Vec<Profile>,
    #[serde(default)]
    invalid: Vec<Profile>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(rename = "Name")]
    name: String,
}

impl MinikubeProvider {
    pub fn new(runner: Arc<dyn CommandRunner>, state: StateDir) -> Self {
        Self { runner, state }
    }

    fn minikube(&self, name: &str) -> Invocation {
        Invocation::new("minikube")
            .env("KUBECONFIG", self.state.kubeconfig_path(name).display().to_string())
    }
}

#[async_trait]
impl ClusterProvider for MinikubeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Minikube
    }

    fn handle(&self, name: &str) -> ClusterHandle {
        ClusterHandle {
            name: name.to_string(),
            context: name.to_string(),
            kubeconfig: self.state.kubeconfig_path(name),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let output = self
            .runner
            .run(&Invocation::new("minikube").args(["profile", "list", "-o", "json"]))
            .await?;

        // minikube exits non-zero when no profile exists at all
        if !output.is_success() && output.stdout.trim().is_empty() {
            return Ok(false);
        }

        let profiles: ProfileList = match serde_json::from_str(&output.stdout) {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Unreadable minikube profile list, assuming no profiles");
                ProfileList::default()
            }
        };

        Ok(profiles
            .valid
            .iter()
            .chain(profiles.invalid.iter())
            .any(|p| p.name == name))
    }

    async fn create(&self, spec: &ClusterSpec, descriptor: &Descriptor) -> Result<ClusterHandle> {
        self.state.ensure()?;
        let handle = self.handle(&spec.name);

        info!(
            cluster = %spec.name,
            nodes = descriptor.node_count(),
            version = %spec.kubernetes_version,
            "Starting minikube profile"
        );

        self.runner
            .run_checked(
                &self
                    .minikube(&spec.name)
                    .args(["start", "-p", spec.name.as_str()])
                    .arg(format!("--kubernetes-version={}", spec.kubernetes_version))
                    .arg(format!("--nodes={}", descriptor.node_count()))
                    .arg(format!("--apiserver-port={}", spec.api_port))
                    .arg("--driver=docker"),
            )
            .await?;

        Ok(handle)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        info!(cluster = name, "Deleting minikube profile");
        self.runner
            .run_checked(&self.minikube(name).args(["delete", "-p", name]))
            .await?;
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<()> {
        info!(cluster = name, "Starting minikube profile");
        self.runner
            .run_checked(&self.minikube(name).args(["start", "-p", name]))
            .await?;
        Ok(())
    }

    async fn stop(&self, name: &str) -> Result<()> {
        info!(cluster = name, "Stopping minikube profile");
        self.runner
            .run_checked(&self.minikube(name).args(["stop", "-p", name]))
            .await?;
        Ok(())
    }

    async fn export_logs(&self, name: &str, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let file = dir.join("minikube.log");
        info!(cluster = name, file = %file.display(), "Exporting minikube logs");
        self.runner
            .run_checked(
                &self
                    .minikube(name)
                    .args(["logs", "-p", name])
                    .arg(format!("--file={}", file.display())),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exec::mock::ScriptedRunner;
    use crate::exec::CommandOutput;
    use crate::topology::render;

    #[tokio::test]
    async fn test_create_passes_node_count_and_version() {
        let dir = tempfile::tempdir().expect("should be able to create tempdir");
        let runner = Arc::new(ScriptedRunner::new());
        let provider = MinikubeProvider::new(runner.clone(), StateDir::new(dir.path()));
        let spec = Config {
            workers: 1,
            ..Config::default()
        }
        .cluster_spec()
        .unwrap();

        let handle = provider
            .create(&spec, &render(&spec).unwrap())
            .await
            .unwrap();

        assert_eq!(handle.context, "local-dev");
        let start = &runner.calls()[0];
        assert_eq!(start.summary(3), "minikube start -p local-dev");
        assert!(start.args.contains(&"--nodes=2".to_string()));
        assert!(start.args.contains(&"--kubernetes-version=v1.29.2".to_string()));
        assert_eq!(start.env[0].0, "KUBECONFIG");
        assert!(start.env[0].1.ends_with("local-dev.kubeconfig"));
    }

    #[tokio::test]
    async fn test_exists_reads_valid_and_invalid_profiles() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            "minikube profile list",
            CommandOutput::success(
                r#"{"invalid":[{"Name":"broken"}],"valid":[{"Name":"local-dev","Status":"Running"}]}"#,
            ),
        );
        let provider = MinikubeProvider::new(runner.clone(), StateDir::new("/tmp"));

        assert!(provider.exists("local-dev").await.unwrap());
        assert!(provider.exists("broken").await.unwrap());
        assert!(!provider.exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_without_any_profile() {
        let runner = Arc::new(ScriptedRunner::new());
        runner.on(
            "minikube profile list",
            CommandOutput::failure(85, "No minikube profile was found."),
        );
        let provider = MinikubeProvider::new(runner.clone(), StateDir::new("/tmp"));

        assert!(!provider.exists("local-dev").await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_and_start_pass_through() {
        let runner = Arc::new(ScriptedRunner::new());
        let provider = MinikubeProvider::new(runner.clone(), StateDir::new("/tmp"));

        provider.stop("dev").await.unwrap();
        provider.start("dev").await.unwrap();

        assert_eq!(
            runner.lines(),
            vec!["minikube stop -p dev".to_string(), "minikube start -p dev".to_string()]
        );
    }
}
