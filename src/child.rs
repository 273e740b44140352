//! Child resource kinds owned by an Arcus
//!
//! The four kinds form a closed set. The controller walks
//! [`ChildKind::RECONCILE_ORDER`] and handles every kind through the same
//! fetch / build / synchronize path instead of four copies of it.

use std::fmt;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::api::ObjectMeta;
use kube::ResourceExt;

use crate::crd::EnsembleIdentity;
use crate::sync::Synchronize;
use crate::Error;

/// Kind of a child resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKind {
    /// Bootstrap and health check scripts
    ConfigMap,
    /// Cap on concurrently unavailable members
    PodDisruptionBudget,
    /// Headless Service giving members stable DNS names
    Service,
    /// The ensemble members
    StatefulSet,
}

impl ChildKind {
    /// Order children are reconciled in. Scripts exist before the pods that
    /// mount them, and the Service before the members that resolve peers.
    pub const RECONCILE_ORDER: [ChildKind; 4] = [
        ChildKind::ConfigMap,
        ChildKind::PodDisruptionBudget,
        ChildKind::Service,
        ChildKind::StatefulSet,
    ];

    /// Kubernetes kind name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMap => "ConfigMap",
            Self::PodDisruptionBudget => "PodDisruptionBudget",
            Self::Service => "Service",
            Self::StatefulSet => "StatefulSet",
        }
    }

    /// Name of this kind's object for the given ensemble
    pub fn object_name(&self, identity: &EnsembleIdentity) -> String {
        match self {
            Self::ConfigMap => identity.config_map_name(),
            Self::PodDisruptionBudget => identity.pdb_name(),
            Self::Service => identity.headless_service_name(),
            Self::StatefulSet => identity.statefulset_name(),
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed child resource
#[derive(Clone, Debug, PartialEq)]
pub enum ChildResource {
    /// ConfigMap holding the scripts
    ConfigMap(ConfigMap),
    /// policy/v1 PodDisruptionBudget
    PodDisruptionBudget(PodDisruptionBudget),
    /// Headless Service
    Service(Service),
    /// StatefulSet running the members
    StatefulSet(StatefulSet),
}

impl ChildResource {
    /// Kind of the wrapped object
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::ConfigMap(_) => ChildKind::ConfigMap,
            Self::PodDisruptionBudget(_) => ChildKind::PodDisruptionBudget,
            Self::Service(_) => ChildKind::Service,
            Self::StatefulSet(_) => ChildKind::StatefulSet,
        }
    }

    /// Metadata of the wrapped object
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::ConfigMap(o) => &o.metadata,
            Self::PodDisruptionBudget(o) => &o.metadata,
            Self::Service(o) => &o.metadata,
            Self::StatefulSet(o) => &o.metadata,
        }
    }

    /// Name of the wrapped object
    pub fn name(&self) -> String {
        match self {
            Self::ConfigMap(o) => o.name_any(),
            Self::PodDisruptionBudget(o) => o.name_any(),
            Self::Service(o) => o.name_any(),
            Self::StatefulSet(o) => o.name_any(),
        }
    }

    /// Copy the owned fields of `desired` into `self`
    ///
    /// Returns whether anything changed. Fails if the kinds differ.
    pub fn synchronize(&mut self, desired: &ChildResource) -> Result<bool, Error> {
        match (self, desired) {
            (Self::ConfigMap(o), Self::ConfigMap(d)) => Ok(o.synchronize(d)),
            (Self::PodDisruptionBudget(o), Self::PodDisruptionBudget(d)) => Ok(o.synchronize(d)),
            (Self::Service(o), Self::Service(d)) => Ok(o.synchronize(d)),
            (Self::StatefulSet(o), Self::StatefulSet(d)) => Ok(o.synchronize(d)),
            (observed, desired) => Err(Error::internal(format!(
                "cannot synchronize {} from {}",
                observed.kind(),
                desired.kind()
            ))),
        }
    }

    /// YAML manifest of the wrapped object
    pub fn to_yaml(&self) -> Result<String, Error> {
        let yaml = match self {
            Self::ConfigMap(o) => serde_yaml::to_string(o)?,
            Self::PodDisruptionBudget(o) => serde_yaml::to_string(o)?,
            Self::Service(o) => serde_yaml::to_string(o)?,
            Self::StatefulSet(o) => serde_yaml::to_string(o)?,
        };
        Ok(yaml)
    }
}
