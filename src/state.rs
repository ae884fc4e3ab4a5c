//! Local per-cluster artifacts
//!
//! Each cluster owns `<name>.kubeconfig` and `<name>.kind.yaml` under the
//! state directory. Both are removed together with the cluster.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn kubeconfig_path(&self, cluster: &str) -> PathBuf {
        self.root.join(format!("{}.kubeconfig", cluster))
    }

    pub fn descriptor_path(&self, cluster: &str) -> PathBuf {
        self.root.join(format!("{}.kind.yaml", cluster))
    }

    /// Directory for a diagnostic log dump taken at `at`
    pub fn log_dir(&self, cluster: &str, at: DateTime<Utc>) -> PathBuf {
        self.root
            .join(format!("{}-logs-{}", cluster, at.format("%Y%m%dT%H%M%SZ")))
    }

    pub fn ensure(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn write_descriptor(&self, cluster: &str, yaml: &str) -> Result<PathBuf> {
        self.ensure()?;
        let path = self.descriptor_path(cluster);
        std::fs::write(&path, yaml)?;
        debug!(path = %path.display(), "Wrote topology descriptor");
        Ok(path)
    }

    /// Delete the cluster's kubeconfig and descriptor
    ///
    /// Missing files are not an error. Returns the paths actually removed.
    pub fn remove_artifacts(&self, cluster: &str) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in [self.kubeconfig_path(cluster), self.descriptor_path(cluster)] {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Removed local artifact");
                    removed.push(path);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Artifact already absent");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}
