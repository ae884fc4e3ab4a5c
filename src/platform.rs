//! Host platform and prerequisite checks

use crate::config::ProviderKind;
use crate::error::{Error, Result};
use crate::exec::{CommandRunner, Invocation};
use tracing::{debug, info};

const SUPPORTED_OS: &[&str] = &["linux", "macos"];
const SUPPORTED_ARCH: &[&str] = &["x86_64", "aarch64"];

/// Fail with `UnsupportedPlatform` unless `os`/`arch` is a known-good pair
pub fn check_platform(os: &str, arch: &str) -> Result<()> {
    if SUPPORTED_OS.contains(&os) && SUPPORTED_ARCH.contains(&arch) {
        Ok(())
    } else {
        Err(Error::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }
}

/// Tools a provider needs on `PATH`, with install hints
pub fn required_tools(provider: ProviderKind) -> Vec<(&'static str, &'static str)> {
    let mut tools = vec![
        ("docker", "Install Docker: https://docs.docker.com/get-docker/"),
        ("kubectl", "Install kubectl: https://kubernetes.io/docs/tasks/tools/"),
    ];
    match provider {
        ProviderKind::Kind => tools.push((
            "kind",
            "Install kind: https://kind.sigs.k8s.io/docs/user/quick-start/#installation",
        )),
        ProviderKind::Minikube => tools.push((
            "minikube",
            "Install minikube: https://minikube.sigs.k8s.io/docs/start/",
        )),
    }
    tools
}

/// Verify every tool the provider needs resolves on `PATH`
pub async fn check_prerequisites(runner: &dyn CommandRunner, provider: ProviderKind) -> Result<()> {
    for (tool, hint) in required_tools(provider) {
        let found = runner
            .run(&Invocation::new("which").arg(tool))
            .await
            .map(|out| out.is_success())
            .unwrap_or(false);

        if !found {
            return Err(Error::PrerequisiteNotFound {
                tool: tool.to_string(),
                hint: hint.to_string(),
            });
        }
        debug!(tool = tool, "Prerequisite found");
    }

    info!(provider = %provider, "All prerequisites found");
    Ok(())
}
