//! Errors raised while provisioning or tearing down a user's environments.

use std::path::PathBuf;

use condaspawn_core::path_validation::PathValidationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Which identity database a failed lookup went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    User,
    Group,
}

impl std::fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Group => f.write_str("group"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unknown {kind} '{name}'")]
    Lookup { kind: IdentityKind, name: String },

    #[error("`{command}` failed ({status}): {stderr}")]
    Tooling {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{context} '{}': {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    OutsideHome(#[from] PathValidationError),

    #[error("spawner serves '{expected}', asked to start for '{found}'")]
    UserMismatch { expected: String, found: String },

    /// Failure reported by the wrapped host spawner, passed through unchanged.
    #[error(transparent)]
    Host(anyhow::Error),

    #[error("provisioning worker: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ProvisionError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// True for errors that only mean "already gone".
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
