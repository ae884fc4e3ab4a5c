//! Error types for cluster lifecycle operations
//!
//! Every failure carries a stable reason code so scripts can branch on
//! `error[<reason>]` lines instead of parsing messages.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("prerequisite not found: {tool} - {hint}")]
    PrerequisiteNotFound { tool: String, hint: String },

    #[error("invalid cluster spec: {0}")]
    InvalidSpec(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command failed: {command} - {message}")]
    ProviderCallFailed { command: String, message: String },

    #[error("cluster {cluster} not ready after {attempts} attempts")]
    ReadinessTimeout { cluster: String, attempts: u32 },

    #[error("unknown addon: {0}")]
    UnknownAddon(String),

    #[error("addon {addon} is not supported by the {provider} provider")]
    UnsupportedAddon { addon: String, provider: String },

    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("kubeconfig error in {path}: {message}")]
    Kubeconfig { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn provider_call(command: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ProviderCallFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Stable, kebab-case identifier for this failure
    pub fn reason_code(&self) -> &'static str {
        match self {
            Error::UnsupportedPlatform { .. } => "unsupported-platform",
            Error::PrerequisiteNotFound { .. } => "prerequisite-not-found",
            Error::InvalidSpec(_) => "invalid-spec",
            Error::Config(_) | Error::Toml(_) => "invalid-config",
            Error::Spawn { .. } => "spawn-failed",
            Error::ProviderCallFailed { .. } => "provider-call-failed",
            Error::ReadinessTimeout { .. } => "readiness-timeout",
            Error::UnknownAddon(_) => "unknown-addon",
            Error::UnsupportedAddon { .. } => "unsupported-addon",
            Error::ClusterNotFound(_) => "cluster-not-found",
            Error::Kubeconfig { .. } => "kubeconfig",
            Error::Io(_) => "io",
            Error::Yaml(_) | Error::Json(_) => "serialization",
        }
    }

    /// Process exit code for this failure
    ///
    /// All failures map to 1; success is the only path to 0.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether the external tool itself could not be executed
    ///
    /// Addon sequences keep going past failed manifests but stop when the
    /// tool they depend on is missing.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(self, Error::Spawn { .. })
    }
}
