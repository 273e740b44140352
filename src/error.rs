//! Error types for the Arcus operator

use thiserror::Error;

/// Main error type for Arcus operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A create or update lost an optimistic concurrency race
    #[error("conflict writing {kind} {namespace}/{name}: object was modified concurrently")]
    Conflict {
        /// Kind of the object being written
        kind: String,
        /// Namespace of the object
        namespace: String,
        /// Name of the object
        name: String,
    },

    /// The owner back-reference for child resources could not be built
    #[error("cannot build owner reference for Arcus {name}: {message}")]
    OwnerReference {
        /// Name of the Arcus resource
        name: String,
        /// Why the reference could not be built
        message: String,
    },

    /// Replica hostname does not carry a `<base>-<ordinal>` suffix
    #[error("hostname '{hostname}' does not match <base>-<ordinal>")]
    InvalidHostname {
        /// The hostname that failed to parse
        hostname: String,
    },

    /// Validation error for CRD specs
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Bootstrap script template failed to render
    #[error("template error: {0}")]
    Template(String),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a conflict error for the named object
    pub fn conflict(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create an owner reference error for the named Arcus
    pub fn owner_reference(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OwnerReference {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Whether the next trigger can be expected to succeed without a spec change.
    ///
    /// Conflicts and API errors clear up on their own; validation and
    /// serialization errors need the user to fix the resource.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Kube(_) | Self::Conflict { .. } | Self::OwnerReference { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Self::Template(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
