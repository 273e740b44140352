//! Arcus Custom Resource Definition
//!
//! An Arcus declares a ZooKeeper ensemble. The operator fills unset fields
//! with defaults, writes them back, and derives the ConfigMap, headless
//! Service, StatefulSet and PodDisruptionBudget that run the ensemble.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{CustomResource, Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::identity::{selector_labels_for, EnsembleIdentity};
use super::types::ZookeeperSpec;

/// Specification for an Arcus cluster
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "jam2in.com",
    version = "v1",
    kind = "Arcus",
    plural = "arcuses",
    shortname = "arcus",
    namespaced,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.zookeeper.replicas"}"#,
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.zookeeper.image.name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ArcusSpec {
    /// ZooKeeper ensemble backing the cluster
    #[serde(default)]
    pub zookeeper: ZookeeperSpec,
}

impl Arcus {
    /// Fill unset spec fields with defaults. Returns true if anything changed.
    pub fn with_defaults(&mut self) -> bool {
        let labels = selector_labels_for(&self.name_any());
        self.spec.zookeeper.apply_defaults(&labels)
    }

    /// Identity of the ensemble; fails for a resource without a namespace
    pub fn identity(&self) -> Result<EnsembleIdentity, crate::Error> {
        let namespace = self.namespace().ok_or_else(|| {
            crate::Error::validation(format!("Arcus {} has no namespace", self.name_any()))
        })?;
        Ok(EnsembleIdentity::new(self.name_any(), namespace))
    }

    /// Controller owner reference stamped on every child
    ///
    /// Fails while the Arcus is being deleted or before the API server has
    /// assigned it a uid.
    pub fn owner_reference(&self) -> Result<OwnerReference, crate::Error> {
        if self.meta().deletion_timestamp.is_some() {
            return Err(crate::Error::owner_reference(
                self.name_any(),
                "resource is being deleted",
            ));
        }
        self.controller_owner_ref(&()).ok_or_else(|| {
            crate::Error::owner_reference(self.name_any(), "resource has no name or uid")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::api::ObjectMeta;

    fn arcus(name: &str) -> Arcus {
        Arcus {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("cache".to_string()),
                uid: Some("uid-1234".to_string()),
                ..Default::default()
            },
            spec: ArcusSpec::default(),
        }
    }

    #[test]
    fn with_defaults_reaches_fixed_point() {
        let mut resource = arcus("arcus");

        assert!(resource.with_defaults());
        assert_eq!(resource.spec.zookeeper.replicas, 3);
        assert!(!resource.with_defaults());
    }

    #[test]
    fn owner_reference_points_at_arcus_as_controller() {
        let owner = arcus("arcus").owner_reference().unwrap();

        assert_eq!(owner.kind, "Arcus");
        assert_eq!(owner.api_version, "jam2in.com/v1");
        assert_eq!(owner.name, "arcus");
        assert_eq!(owner.uid, "uid-1234");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn owner_reference_fails_during_deletion() {
        let mut resource = arcus("arcus");
        resource.metadata.deletion_timestamp = Some(Time(Default::default()));

        let err = resource.owner_reference().unwrap_err();
        assert!(matches!(err, crate::Error::OwnerReference { .. }));
    }

    #[test]
    fn owner_reference_fails_without_uid() {
        let mut resource = arcus("arcus");
        resource.metadata.uid = None;

        assert!(resource.owner_reference().is_err());
    }

    #[test]
    fn identity_requires_namespace() {
        let mut resource = arcus("arcus");
        assert_eq!(resource.identity().unwrap().namespace(), "cache");

        resource.metadata.namespace = None;
        assert!(resource.identity().is_err());
    }

    #[test]
    fn crd_is_namespaced_under_jam2in() {
        use kube::CustomResourceExt;
        let crd = Arcus::crd();

        assert_eq!(crd.spec.group, "jam2in.com");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.kind, "Arcus");
    }
}
