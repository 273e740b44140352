//! Names and labels derived from an Arcus resource
//!
//! Every child object name is the Arcus name plus a fixed suffix, so two Arcus
//! resources in one namespace never share a child.

use std::collections::BTreeMap;

/// Suffix of the bootstrap script ConfigMap
pub const CONFIG_MAP_SUFFIX: &str = "-cm";
/// Suffix of the PodDisruptionBudget
pub const PDB_SUFFIX: &str = "-pdb";
/// Suffix of the headless Service
pub const HEADLESS_SERVICE_SUFFIX: &str = "-zk-headless-svc";
/// Suffix of the StatefulSet (also the container name)
pub const STATEFULSET_SUFFIX: &str = "-zk";
/// Suffix of the script volume
pub const VOLUME_SUFFIX: &str = "-zk-vol";

/// Label naming the application
pub const LABEL_NAME: &str = "app.kubernetes.io/name";
/// Label naming the owning Arcus
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
/// Label naming the managing operator
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
/// Value of [`LABEL_NAME`]
pub const APP_NAME: &str = "arcus-zookeeper";

/// Name and namespace of an ensemble plus everything derived from them
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnsembleIdentity {
    name: String,
    namespace: String,
}

impl EnsembleIdentity {
    /// Create an identity for the Arcus `name` in `namespace`
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Name of the Arcus resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace of the Arcus resource and all of its children
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// ConfigMap holding the bootstrap and health check scripts
    pub fn config_map_name(&self) -> String {
        format!("{}{CONFIG_MAP_SUFFIX}", self.name)
    }

    /// PodDisruptionBudget name
    pub fn pdb_name(&self) -> String {
        format!("{}{PDB_SUFFIX}", self.name)
    }

    /// Headless Service name
    pub fn headless_service_name(&self) -> String {
        format!("{}{HEADLESS_SERVICE_SUFFIX}", self.name)
    }

    /// StatefulSet name; pods are `<statefulset>-<ordinal>`
    pub fn statefulset_name(&self) -> String {
        format!("{}{STATEFULSET_SUFFIX}", self.name)
    }

    /// Script volume name
    pub fn volume_name(&self) -> String {
        format!("{}{VOLUME_SUFFIX}", self.name)
    }

    /// DNS domain under which every member is addressable
    pub fn service_domain(&self, cluster_domain: &str) -> String {
        format!(
            "{}.{}.svc.{cluster_domain}",
            self.headless_service_name(),
            self.namespace
        )
    }

    /// Stable hostname of the member with the given ordinal
    pub fn member_host(&self, ordinal: u32, cluster_domain: &str) -> String {
        format!(
            "{}-{ordinal}.{}",
            self.statefulset_name(),
            self.service_domain(cluster_domain)
        )
    }

    /// Labels shared by every child and used by every selector
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        selector_labels_for(&self.name)
    }
}

/// Selector labels for the Arcus called `name`
pub fn selector_labels_for(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), APP_NAME.to_string()),
        (LABEL_INSTANCE.to_string(), name.to_string()),
        (LABEL_MANAGED_BY.to_string(), crate::OPERATOR_NAME.to_string()),
    ])
}
