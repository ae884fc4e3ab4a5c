//! Cluster configuration
//!
//! Values are resolved from built-in defaults, an optional TOML file,
//! `DEVCLUSTER_*` environment variables and finally CLI flags, in that
//! order of increasing precedence.

use crate::error::{Error, Result};
use crate::readiness::{Backoff, RetryBudget};
use serde::Deserialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Environment variable pointing at a TOML config file
pub const CONFIG_ENV: &str = "DEVCLUSTER_CONFIG";

/// Which local cluster tool provisions the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Kubernetes in Docker, one container per node
    #[default]
    Kind,
    /// minikube profile, one VM or container per node
    Minikube,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Kind => "kind",
            ProviderKind::Minikube => "minikube",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kind" => Ok(ProviderKind::Kind),
            "minikube" => Ok(ProviderKind::Minikube),
            other => Err(Error::config(format!("unknown provider: {}", other))),
        }
    }
}

/// IPv4 network in CIDR notation (e.g. `172.23.0.0/24`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: Ipv4Addr,
    prefix: u8,
}

impl Subnet {
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Address at `offset` from the network address, if it stays inside the subnet
    pub fn host(&self, offset: u32) -> Option<Ipv4Addr> {
        let size = 1u64 << (32 - u32::from(self.prefix));
        if u64::from(offset) >= size {
            return None;
        }
        Some(Ipv4Addr::from(u32::from(self.network) + offset))
    }
}

impl FromStr for Subnet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| Error::config(format!("subnet {} is not in CIDR notation", s)))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| Error::config(format!("subnet {} has an invalid address", s)))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| Error::config(format!("subnet {} has an invalid prefix", s)))?;

        let mask = if prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix))
        };
        if u32::from(addr) & !mask != 0 {
            return Err(Error::config(format!(
                "subnet {} has host bits set",
                s
            )));
        }

        Ok(Subnet {
            network: addr,
            prefix,
        })
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Everything needed to provision one cluster
///
/// Built once per invocation from [`Config`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpec {
    pub name: String,
    pub network: String,
    pub subnet: Subnet,
    pub node_image: String,
    pub kubernetes_version: String,
    /// Signed so that negative input reaches the renderer and is rejected there
    pub worker_count: i32,
    pub api_port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetrySettings {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub delay_secs: u64,

    /// Grow the delay geometrically instead of keeping it fixed
    #[serde(default)]
    pub backoff_factor: Option<f64>,

    #[serde(default)]
    pub max_delay_secs: Option<u64>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: default_retry_attempts(),
            delay_secs: default_retry_delay_secs(),
            backoff_factor: None,
            max_delay_secs: None,
        }
    }
}

impl RetrySettings {
    pub fn budget(&self) -> RetryBudget {
        let delay = Duration::from_secs(self.delay_secs);
        let backoff = match self.backoff_factor {
            Some(factor) => Backoff::Exponential {
                factor,
                max_delay: Duration::from_secs(self.max_delay_secs.unwrap_or(300)),
            },
            None => Backoff::Fixed,
        };
        RetryBudget::new(self.attempts, delay).with_backoff(backoff)
    }
}

/// Settings for the MinIO object storage addon
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MinioSettings {
    #[serde(default = "default_minio_namespace")]
    pub namespace: String,

    #[serde(default = "default_minio_image")]
    pub image: String,

    #[serde(default = "default_minio_user")]
    pub root_user: String,

    #[serde(default = "default_minio_password")]
    pub root_password: String,
}

impl Default for MinioSettings {
    fn default() -> Self {
        Self {
            namespace: default_minio_namespace(),
            image: default_minio_image(),
            root_user: default_minio_user(),
            root_password: default_minio_password(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "default_subnet")]
    pub subnet: String,

    /// Node image for kind clusters
    #[serde(default = "default_node_image")]
    pub node_image: String,

    /// Kubernetes version for minikube clusters
    #[serde(default = "default_kubernetes_version")]
    pub kubernetes_version: String,

    #[serde(default = "default_workers")]
    pub workers: i32,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Where kubeconfigs, descriptors and log dumps are written
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub minio: MinioSettings,
}

fn default_name() -> String {
    "local-dev".to_string()
}

fn default_network() -> String {
    "local-dev-net".to_string()
}

fn default_subnet() -> String {
    "172.23.0.0/24".to_string()
}

fn default_node_image() -> String {
    "kindest/node:v1.29.2".to_string()
}

fn default_kubernetes_version() -> String {
    "v1.29.2".to_string()
}

fn default_workers() -> i32 {
    2
}

fn default_api_port() -> u16 {
    6443
}

fn default_retry_attempts() -> u32 {
    10
}

fn default_retry_delay_secs() -> u64 {
    15
}

fn default_minio_namespace() -> String {
    "minio".to_string()
}

fn default_minio_image() -> String {
    "quay.io/minio/minio:latest".to_string()
}

fn default_minio_user() -> String {
    "minioadmin".to_string()
}

fn default_minio_password() -> String {
    "minioadmin".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: default_name(),
            provider: ProviderKind::default(),
            network: default_network(),
            subnet: default_subnet(),
            node_image: default_node_image(),
            kubernetes_version: default_kubernetes_version(),
            workers: default_workers(),
            api_port: default_api_port(),
            state_dir: None,
            retry: RetrySettings::default(),
            minio: MinioSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional file and the process environment
    ///
    /// Falls back to `DEVCLUSTER_CONFIG` when no path is given. A missing
    /// explicit file is an error; no file at all means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                debug!(path = %path.display(), "Loading config file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    Error::config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override fields from `DEVCLUSTER_*` variables
    ///
    /// Takes a lookup function so callers (and tests) decide where values come from.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("DEVCLUSTER_NAME") {
            self.name = name;
        }
        if let Some(provider) = lookup("DEVCLUSTER_PROVIDER") {
            self.provider = provider.parse()?;
        }
        if let Some(workers) = lookup("DEVCLUSTER_WORKERS") {
            self.workers = parse_env("DEVCLUSTER_WORKERS", &workers)?;
        }
        if let Some(image) = lookup("DEVCLUSTER_NODE_IMAGE") {
            self.node_image = image;
        }
        if let Some(version) = lookup("DEVCLUSTER_KUBERNETES_VERSION") {
            self.kubernetes_version = version;
        }
        if let Some(subnet) = lookup("DEVCLUSTER_SUBNET") {
            self.subnet = subnet;
        }
        if let Some(dir) = lookup("DEVCLUSTER_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(attempts) = lookup("DEVCLUSTER_RETRY_ATTEMPTS") {
            self.retry.attempts = parse_env("DEVCLUSTER_RETRY_ATTEMPTS", &attempts)?;
        }
        if let Some(delay) = lookup("DEVCLUSTER_RETRY_DELAY_SECS") {
            self.retry.delay_secs = parse_env("DEVCLUSTER_RETRY_DELAY_SECS", &delay)?;
        }
        Ok(())
    }

    /// Reject values no provider could work with
    ///
    /// Worker count is left to the topology renderer.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config("cluster name must not be empty"));
        }
        if self.network.trim().is_empty() {
            return Err(Error::config("network name must not be empty"));
        }
        if self.retry.attempts == 0 {
            return Err(Error::config("retry attempts must be at least 1"));
        }
        if let Some(factor) = self.retry.backoff_factor {
            if factor.is_nan() || factor < 1.0 {
                return Err(Error::config("retry backoff factor must be >= 1.0"));
            }
        }
        if self.api_port == 0 {
            return Err(Error::config("api port must be non-zero"));
        }
        self.subnet.parse::<Subnet>()?;
        Ok(())
    }

    pub fn cluster_spec(&self) -> Result<ClusterSpec> {
        self.validate()?;
        Ok(ClusterSpec {
            name: self.name.clone(),
            network: self.network.clone(),
            subnet: self.subnet.parse()?,
            node_image: self.node_image.clone(),
            kubernetes_version: self.kubernetes_version.clone(),
            worker_count: self.workers,
            api_port: self.api_port,
        })
    }

    pub fn retry_budget(&self) -> RetryBudget {
        self.retry.budget()
    }

    /// Resolved state directory, defaulting to `$HOME/.kube/devcluster`
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".kube").join("devcluster"))
                .unwrap_or_else(|| std::env::temp_dir().join("devcluster"))
        })
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} has an invalid value: {}", key, value)))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
