//! Desired-state compiler for Arcus ensembles
//!
//! [`EnsembleCompiler`] turns an ensemble identity, a defaulted spec and the
//! owner reference into the four child objects:
//!
//! - ConfigMap `<name>-cm` with the init and health check scripts
//! - PodDisruptionBudget `<name>-pdb` allowing one unavailable member
//! - headless Service `<name>-zk-headless-svc` exposing the three ports
//! - StatefulSet `<name>-zk` running the members
//!
//! Compilation is pure: the same inputs always produce identical objects, so
//! comparing a compiled object with the live one is a meaningful drift check.
//!
//! # Usage
//!
//! ```text
//! let identity = arcus.identity()?;
//! let owner = arcus.owner_reference()?;
//! let compiled = EnsembleCompiler::new(&identity, &arcus.spec.zookeeper, &owner).compile()?;
//! for child in compiled.into_children() { ... }
//! ```

mod config_map;
mod disruption;
mod service;
mod statefulset;

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;

use crate::bootstrap::EnsembleBootstrap;
use crate::child::{ChildKind, ChildResource};
use crate::crd::{EnsembleIdentity, ZookeeperSpec};
use crate::Error;

pub use disruption::MAX_UNAVAILABLE;
pub use statefulset::{
    PROBE_FAILURE_THRESHOLD, PROBE_INITIAL_DELAY_SECONDS, PROBE_PERIOD_SECONDS,
    PROBE_SUCCESS_THRESHOLD, PROBE_TIMEOUT_SECONDS,
};

/// The four desired child objects of one ensemble
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledEnsemble {
    /// Script ConfigMap
    pub config_map: ConfigMap,
    /// Disruption budget
    pub pdb: PodDisruptionBudget,
    /// Headless Service
    pub service: Service,
    /// Member StatefulSet
    pub statefulset: StatefulSet,
}

impl CompiledEnsemble {
    /// Desired object of the given kind
    pub fn child(&self, kind: ChildKind) -> ChildResource {
        match kind {
            ChildKind::ConfigMap => ChildResource::ConfigMap(self.config_map.clone()),
            ChildKind::PodDisruptionBudget => ChildResource::PodDisruptionBudget(self.pdb.clone()),
            ChildKind::Service => ChildResource::Service(self.service.clone()),
            ChildKind::StatefulSet => ChildResource::StatefulSet(self.statefulset.clone()),
        }
    }

    /// All desired objects in reconcile order
    pub fn into_children(self) -> Vec<ChildResource> {
        vec![
            ChildResource::ConfigMap(self.config_map),
            ChildResource::PodDisruptionBudget(self.pdb),
            ChildResource::Service(self.service),
            ChildResource::StatefulSet(self.statefulset),
        ]
    }
}

/// Compiles a defaulted spec into child objects
pub struct EnsembleCompiler<'a> {
    identity: &'a EnsembleIdentity,
    spec: &'a ZookeeperSpec,
    owner: &'a OwnerReference,
    cluster_domain: &'a str,
}

impl<'a> EnsembleCompiler<'a> {
    /// Compiler for `spec`, stamping `owner` on every child
    pub fn new(
        identity: &'a EnsembleIdentity,
        spec: &'a ZookeeperSpec,
        owner: &'a OwnerReference,
    ) -> Self {
        Self {
            identity,
            spec,
            owner,
            cluster_domain: crate::DEFAULT_CLUSTER_DOMAIN,
        }
    }

    /// Override the cluster DNS domain used in peer hostnames
    pub fn with_cluster_domain(mut self, cluster_domain: &'a str) -> Self {
        self.cluster_domain = cluster_domain;
        self
    }

    /// Build all four child objects
    pub fn compile(&self) -> Result<CompiledEnsemble, Error> {
        let bootstrap = EnsembleBootstrap::new(self.identity, self.spec, self.cluster_domain);
        Ok(CompiledEnsemble {
            config_map: config_map::compile(self, &bootstrap)?,
            pdb: disruption::compile(self),
            service: service::compile(self),
            statefulset: statefulset::compile(self),
        })
    }

    /// Metadata shared by every child: name, namespace, labels, owner
    fn metadata(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.identity.namespace().to_string()),
            labels: Some(self.identity.selector_labels()),
            owner_references: Some(vec![self.owner.clone()]),
            ..Default::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::collections::BTreeMap;

    use super::*;

    pub fn identity() -> EnsembleIdentity {
        EnsembleIdentity::new("arcus", "cache")
    }

    pub fn owner() -> OwnerReference {
        OwnerReference {
            api_version: "jam2in.com/v1".to_string(),
            kind: "Arcus".to_string(),
            name: "arcus".to_string(),
            uid: "uid-1234".to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    pub fn spec() -> ZookeeperSpec {
        let mut spec = ZookeeperSpec::default();
        spec.apply_defaults(&identity().selector_labels());
        spec
    }

    pub fn compile(spec: &ZookeeperSpec) -> CompiledEnsemble {
        let identity = identity();
        let owner = owner();
        EnsembleCompiler::new(&identity, spec, &owner)
            .compile()
            .unwrap()
    }

    pub fn selector() -> BTreeMap<String, String> {
        identity().selector_labels()
    }

    /// `sts` as the API server stores it: every field it defaults on write
    /// is filled in where unset
    pub fn server_defaulted(mut sts: StatefulSet) -> StatefulSet {
        use k8s_openapi::api::apps::v1::{
            RollingUpdateStatefulSetStrategy, StatefulSetUpdateStrategy,
        };
        use k8s_openapi::api::core::v1::{PodSecurityContext, Probe};

        fn fill<T>(field: &mut Option<T>, value: T) {
            field.get_or_insert(value);
        }
        fn fill_probe(probe: &mut Option<Probe>) {
            if let Some(probe) = probe.as_mut() {
                fill(&mut probe.period_seconds, 10);
                fill(&mut probe.success_threshold, 1);
                fill(&mut probe.failure_threshold, 3);
                fill(&mut probe.timeout_seconds, 1);
            }
        }

        let Some(spec) = sts.spec.as_mut() else {
            return sts;
        };
        fill(&mut spec.revision_history_limit, 10);
        fill(&mut spec.pod_management_policy, "OrderedReady".to_string());
        let strategy = spec
            .update_strategy
            .get_or_insert_with(StatefulSetUpdateStrategy::default);
        fill(&mut strategy.type_, "RollingUpdate".to_string());
        fill(
            &mut strategy.rolling_update,
            RollingUpdateStatefulSetStrategy {
                partition: Some(0),
                ..Default::default()
            },
        );
        if let Some(pod) = spec.template.spec.as_mut() {
            fill(&mut pod.restart_policy, "Always".to_string());
            fill(&mut pod.dns_policy, "ClusterFirst".to_string());
            fill(&mut pod.scheduler_name, "default-scheduler".to_string());
            fill(&mut pod.security_context, PodSecurityContext::default());
            fill(&mut pod.termination_grace_period_seconds, 30);
            for container in &mut pod.containers {
                fill(
                    &mut container.termination_message_path,
                    "/dev/termination-log".to_string(),
                );
                fill(&mut container.termination_message_policy, "File".to_string());
                fill(&mut container.image_pull_policy, "IfNotPresent".to_string());
                fill_probe(&mut container.readiness_probe);
                fill_probe(&mut container.liveness_probe);
            }
        }
        sts
    }
}
