//! Supporting types for the Arcus CRD
//!
//! Every group uses `#[serde(default)]` so a partially written manifest
//! deserializes with zero values in the unset fields. The defaulter in
//! [`super::defaults`] then fills those zeros in place.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use k8s_openapi::api::core::v1::{Affinity, EnvVar, ResourceRequirements, Toleration};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ZooKeeper ensemble specification
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZookeeperSpec {
    /// Number of ensemble members
    #[serde(default)]
    pub replicas: i32,

    /// Container image
    #[serde(default)]
    pub image: ImageSpec,

    /// Named network ports
    #[serde(default)]
    pub ports: PortsSpec,

    /// Pod placement and runtime policy
    #[serde(default)]
    pub pod: PodPolicySpec,

    /// Filesystem layout inside the container
    #[serde(default)]
    pub directory: DirectorySpec,

    /// Ensemble tuning parameters written to zoo.cfg
    #[serde(default)]
    pub configuration: ConfigurationSpec,
}

impl ZookeeperSpec {
    /// Validate a defaulted specification
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.replicas < 1 {
            return Err(crate::Error::validation(format!(
                "replicas must be at least 1, got {}",
                self.replicas
            )));
        }
        self.ports.validate()?;
        self.pod.validate()?;
        self.directory.validate()?;
        self.configuration.validate()
    }
}

/// Container image reference
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Image name including tag
    #[serde(default)]
    pub name: String,

    /// Kubernetes image pull policy (Always, IfNotPresent, Never)
    #[serde(default)]
    pub pull_policy: String,
}

/// Ports exposed by every ensemble member
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortsSpec {
    /// Client connection port
    #[serde(default)]
    pub client: u16,

    /// Peer replication port
    #[serde(default)]
    pub server: u16,

    /// Leader election port
    #[serde(default)]
    pub leader_election: u16,
}

impl PortsSpec {
    fn validate(&self) -> Result<(), crate::Error> {
        let ports = [self.client, self.server, self.leader_election];
        if ports.iter().collect::<HashSet<_>>().len() != ports.len() {
            return Err(crate::Error::validation(format!(
                "client, server and leaderElection ports must be distinct, got {}/{}/{}",
                self.client, self.server, self.leader_election
            )));
        }
        Ok(())
    }
}

/// Pod placement and runtime policy
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodPolicySpec {
    /// Node labels the pods must match
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Scheduling affinity; defaults to spreading members across hosts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,

    /// Compute resources for the ZooKeeper container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Tolerations applied to the pods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,

    /// Extra environment variables for the container
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,

    /// Seconds to wait for graceful shutdown
    #[serde(default)]
    pub termination_grace_period_seconds: i64,
}

impl PodPolicySpec {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.termination_grace_period_seconds < 0 {
            return Err(crate::Error::validation(format!(
                "terminationGracePeriodSeconds must not be negative, got {}",
                self.termination_grace_period_seconds
            )));
        }
        Ok(())
    }
}

/// Directory layout inside the ZooKeeper container
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySpec {
    /// ZooKeeper installation directory (contains bin/zkServer.sh)
    #[serde(default)]
    pub home: String,

    /// Directory zoo.cfg is written to
    #[serde(default)]
    pub conf: String,

    /// Data directory holding myid and snapshots
    #[serde(default)]
    pub data: String,
}

impl DirectorySpec {
    /// Paths end up in shell scripts, so only plain absolute paths pass.
    fn validate(&self) -> Result<(), crate::Error> {
        let paths = [
            ("directory.home", &self.home),
            ("directory.conf", &self.conf),
            ("directory.data", &self.data),
        ];
        for (field, path) in paths {
            let plain = path
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-'));
            if !path.starts_with('/') || !plain {
                return Err(crate::Error::validation(format!(
                    "{field} must be an absolute path of [A-Za-z0-9/._-], got {path:?}"
                )));
            }
        }
        Ok(())
    }
}

/// How a member lists itself in its own peer list
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum LocalPeerAddress {
    /// Bind the local entry to 0.0.0.0
    #[default]
    Wildcard,
    /// Use the member's own stable hostname like every other entry
    Hostname,
}

impl fmt::Display for LocalPeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "Wildcard"),
            Self::Hostname => write!(f, "Hostname"),
        }
    }
}

/// Ensemble tuning parameters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSpec {
    /// Maximum concurrent connections from a single client IP
    #[serde(default)]
    pub max_client_cnxns: i32,

    /// Basic time unit in milliseconds
    #[serde(default)]
    pub tick_time: i32,

    /// Ticks a follower may take to connect and sync to the leader
    #[serde(default)]
    pub init_limit: i32,

    /// Ticks a follower may lag behind the leader
    #[serde(default)]
    pub sync_limit: i32,

    /// Minimum client session timeout in milliseconds
    #[serde(default)]
    pub min_session_timeout: i32,

    /// Maximum client session timeout in milliseconds
    #[serde(default)]
    pub max_session_timeout: i32,

    /// Address a member uses for its own peer entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_peer_address: Option<LocalPeerAddress>,
}

impl ConfigurationSpec {
    fn validate(&self) -> Result<(), crate::Error> {
        let positive = [
            ("maxClientCnxns", self.max_client_cnxns),
            ("tickTime", self.tick_time),
            ("initLimit", self.init_limit),
            ("syncLimit", self.sync_limit),
            ("minSessionTimeout", self.min_session_timeout),
            ("maxSessionTimeout", self.max_session_timeout),
        ];
        if let Some((field, value)) = positive.iter().find(|(_, v)| *v <= 0) {
            return Err(crate::Error::validation(format!(
                "{field} must be positive, got {value}"
            )));
        }
        if self.min_session_timeout > self.max_session_timeout {
            return Err(crate::Error::validation(format!(
                "minSessionTimeout ({}) must not exceed maxSessionTimeout ({})",
                self.min_session_timeout, self.max_session_timeout
            )));
        }
        Ok(())
    }

    /// Local peer address policy, falling back to the wildcard
    pub fn local_peer_address(&self) -> LocalPeerAddress {
        self.local_peer_address.unwrap_or_default()
    }
}
