//! Defaulting for the Arcus specification
//!
//! Each nested group fills its own zero-valued fields and reports whether it
//! changed anything; parents OR the flags together. Applying defaults to an
//! already defaulted spec is a no-op that reports `false`.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Affinity, PodAffinityTerm, PodAntiAffinity, ResourceRequirements, WeightedPodAffinityTerm,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

use super::types::{
    ConfigurationSpec, DirectorySpec, ImageSpec, LocalPeerAddress, PodPolicySpec, PortsSpec,
    ZookeeperSpec,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default ensemble size
pub const DEFAULT_REPLICAS: i32 = 3;
/// Default ZooKeeper image
pub const DEFAULT_IMAGE: &str = "zookeeper:3.5.9";
/// Default image pull policy
pub const DEFAULT_PULL_POLICY: &str = "IfNotPresent";
/// Default client port
pub const DEFAULT_CLIENT_PORT: u16 = 2181;
/// Default peer replication port
pub const DEFAULT_SERVER_PORT: u16 = 2888;
/// Default leader election port
pub const DEFAULT_LEADER_ELECTION_PORT: u16 = 3888;
/// Default ZooKeeper installation directory
pub const DEFAULT_HOME_DIR: &str = "/apache-zookeeper-3.5.9-bin";
/// Default configuration directory
pub const DEFAULT_CONF_DIR: &str = "/conf";
/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "/data";
/// Default per-client connection limit
pub const DEFAULT_MAX_CLIENT_CNXNS: i32 = 100;
/// Default tick in milliseconds
pub const DEFAULT_TICK_TIME: i32 = 2000;
/// Default init limit in ticks
pub const DEFAULT_INIT_LIMIT: i32 = 10;
/// Default sync limit in ticks
pub const DEFAULT_SYNC_LIMIT: i32 = 5;
/// Default minimum session timeout in milliseconds
pub const DEFAULT_MIN_SESSION_TIMEOUT: i32 = 4000;
/// Default maximum session timeout in milliseconds
pub const DEFAULT_MAX_SESSION_TIMEOUT: i32 = 200_000;
/// Default termination grace period in seconds
pub const DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS: i64 = 30;
/// Default CPU request
pub const DEFAULT_CPU_REQUEST: &str = "250m";
/// Default memory request
pub const DEFAULT_MEMORY_REQUEST: &str = "512Mi";
/// Weight of the default host spreading preference
pub const DEFAULT_ANTI_AFFINITY_WEIGHT: i32 = 100;
/// Topology key of the default host spreading preference
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Assign `value` if `field` holds its zero value
fn default_if_zero<T: Default + PartialEq>(field: &mut T, value: T) -> bool {
    if *field == T::default() {
        *field = value;
        true
    } else {
        false
    }
}

/// Assign `make()` if `field` is unset
fn default_if_none<T>(field: &mut Option<T>, make: impl FnOnce() -> T) -> bool {
    if field.is_none() {
        *field = Some(make());
        true
    } else {
        false
    }
}

impl ZookeeperSpec {
    /// Fill unset fields with defaults. Returns true if anything changed.
    ///
    /// `selector_labels` key the default anti-affinity rule and must be the
    /// labels the pods are created with.
    pub fn apply_defaults(&mut self, selector_labels: &BTreeMap<String, String>) -> bool {
        // Non-short-circuiting `|` so every group is visited.
        default_if_zero(&mut self.replicas, DEFAULT_REPLICAS)
            | self.image.apply_defaults()
            | self.ports.apply_defaults()
            | self.pod.apply_defaults(selector_labels)
            | self.directory.apply_defaults()
            | self.configuration.apply_defaults()
    }
}

impl ImageSpec {
    /// Fill unset fields with defaults. Returns true if anything changed.
    pub fn apply_defaults(&mut self) -> bool {
        default_if_zero(&mut self.name, DEFAULT_IMAGE.to_string())
            | default_if_zero(&mut self.pull_policy, DEFAULT_PULL_POLICY.to_string())
    }
}

impl PortsSpec {
    /// Fill unset fields with defaults. Returns true if anything changed.
    pub fn apply_defaults(&mut self) -> bool {
        default_if_zero(&mut self.client, DEFAULT_CLIENT_PORT)
            | default_if_zero(&mut self.server, DEFAULT_SERVER_PORT)
            | default_if_zero(&mut self.leader_election, DEFAULT_LEADER_ELECTION_PORT)
    }
}

impl PodPolicySpec {
    /// Fill unset fields with defaults. Returns true if anything changed.
    ///
    /// Node selector, tolerations and env are allowed to stay empty.
    pub fn apply_defaults(&mut self, selector_labels: &BTreeMap<String, String>) -> bool {
        default_if_none(&mut self.affinity, || {
            spread_across_hosts(selector_labels)
        }) | default_if_none(&mut self.resources, default_resources)
            | default_if_zero(
                &mut self.termination_grace_period_seconds,
                DEFAULT_TERMINATION_GRACE_PERIOD_SECONDS,
            )
    }
}

impl DirectorySpec {
    /// Fill unset fields with defaults. Returns true if anything changed.
    pub fn apply_defaults(&mut self) -> bool {
        default_if_zero(&mut self.home, DEFAULT_HOME_DIR.to_string())
            | default_if_zero(&mut self.conf, DEFAULT_CONF_DIR.to_string())
            | default_if_zero(&mut self.data, DEFAULT_DATA_DIR.to_string())
    }
}

impl ConfigurationSpec {
    /// Fill unset fields with defaults. Returns true if anything changed.
    pub fn apply_defaults(&mut self) -> bool {
        default_if_zero(&mut self.max_client_cnxns, DEFAULT_MAX_CLIENT_CNXNS)
            | default_if_zero(&mut self.tick_time, DEFAULT_TICK_TIME)
            | default_if_zero(&mut self.init_limit, DEFAULT_INIT_LIMIT)
            | default_if_zero(&mut self.sync_limit, DEFAULT_SYNC_LIMIT)
            | default_if_zero(&mut self.min_session_timeout, DEFAULT_MIN_SESSION_TIMEOUT)
            | default_if_zero(&mut self.max_session_timeout, DEFAULT_MAX_SESSION_TIMEOUT)
            | default_if_none(&mut self.local_peer_address, LocalPeerAddress::default)
    }
}

/// Preferred (not required) anti-affinity keeping members on distinct hosts
fn spread_across_hosts(selector_labels: &BTreeMap<String, String>) -> Affinity {
    Affinity {
        pod_anti_affinity: Some(PodAntiAffinity {
            preferred_during_scheduling_ignored_during_execution: Some(vec![
                WeightedPodAffinityTerm {
                    weight: DEFAULT_ANTI_AFFINITY_WEIGHT,
                    pod_affinity_term: PodAffinityTerm {
                        label_selector: Some(LabelSelector {
                            match_labels: Some(selector_labels.clone()),
                            ..Default::default()
                        }),
                        topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
                        ..Default::default()
                    },
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn default_resources() -> ResourceRequirements {
    ResourceRequirements {
        requests: Some(BTreeMap::from([
            ("cpu".to_string(), Quantity(DEFAULT_CPU_REQUEST.to_string())),
            (
                "memory".to_string(),
                Quantity(DEFAULT_MEMORY_REQUEST.to_string()),
            ),
        ])),
        ..Default::default()
    }
}
