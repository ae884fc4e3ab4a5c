//! Cluster topology descriptor
//!
//! Builds the kind `Cluster` document (`kind.x-k8s.io/v1alpha4`) as typed
//! values and serializes it at the boundary. Rendering is pure: the same
//! [`ClusterSpec`] always yields the same document.

use crate::config::ClusterSpec;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const KIND_API_VERSION: &str = "kind.x-k8s.io/v1alpha4";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NodeEntry {
    pub role: NodeRole,
    pub image: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    pub api_server_address: String,
    pub api_server_port: u16,
}

/// Declarative node topology handed to the cluster provider
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub kind: String,
    pub api_version: String,
    pub name: String,
    pub networking: Networking,
    pub nodes: Vec<NodeEntry>,
}

impl Descriptor {
    pub fn control_plane_count(&self) -> usize {
        self.count(NodeRole::ControlPlane)
    }

    pub fn worker_count(&self) -> usize {
        self.count(NodeRole::Worker)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn count(&self, role: NodeRole) -> usize {
        self.nodes.iter().filter(|n| n.role == role).count()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Render the topology for `spec`: one control-plane node, then the workers
///
/// Fails with `InvalidSpec` for a negative worker count or an empty image.
pub fn render(spec: &ClusterSpec) -> Result<Descriptor> {
    if spec.worker_count < 0 {
        return Err(Error::InvalidSpec(format!(
            "worker count must not be negative, got {}",
            spec.worker_count
        )));
    }
    if spec.node_image.trim().is_empty() {
        return Err(Error::InvalidSpec("node image must not be empty".to_string()));
    }

    let node = |role| NodeEntry {
        role,
        image: spec.node_image.clone(),
    };

    let nodes = std::iter::once(node(NodeRole::ControlPlane))
        .chain((0..spec.worker_count).map(|_| node(NodeRole::Worker)))
        .collect();

    Ok(Descriptor {
        kind: "Cluster".to_string(),
        api_version: KIND_API_VERSION.to_string(),
        name: spec.name.clone(),
        networking: Networking {
            api_server_address: "127.0.0.1".to_string(),
            api_server_port: spec.api_port,
        },
        nodes,
    })
}

#[cfg(test)]
#[path = "topology_test.rs"]
mod tests;
