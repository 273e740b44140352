//! Object store access for the Arcus controller
//!
//! Reconciliation only needs get / create / update on the Arcus and its four
//! child kinds. [`ObjectStore`] captures exactly that so the controller can be
//! driven by an in-memory store or a mock in tests, and by [`KubeStore`] in
//! production.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[cfg(test)]
use mockall::automock;

use crate::child::{ChildKind, ChildResource};
use crate::crd::Arcus;
use crate::Error;

/// HTTP status the API server returns for a stale resourceVersion
const CONFLICT: u16 = 409;

/// Trait abstracting the object store for the Arcus controller
///
/// Writes use optimistic concurrency: an object carrying a stale
/// resourceVersion fails with [`Error::Conflict`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an Arcus; `None` if it does not exist
    async fn get_arcus(&self, namespace: &str, name: &str) -> Result<Option<Arcus>, Error>;

    /// Replace an Arcus with the given object
    async fn update_arcus(&self, arcus: &Arcus) -> Result<Arcus, Error>;

    /// Fetch a child by kind and name; `None` if it does not exist
    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ChildResource>, Error>;

    /// Create a child
    async fn create_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> Result<ChildResource, Error>;

    /// Replace a child with the given object
    async fn update_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> Result<ChildResource, Error>;
}

/// Production object store backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
    field_manager: String,
}

impl KubeStore {
    /// Create a store that records `field_manager` on every write
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params(&self) -> PostParams {
        PostParams {
            dry_run: false,
            field_manager: Some(self.field_manager.clone()),
        }
    }

    async fn create<K>(&self, namespace: &str, obj: &K) -> Result<K, Error>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        self.api::<K>(namespace)
            .create(&self.post_params(), obj)
            .await
            .map_err(|e| write_error::<K>(namespace, &obj.name_any(), e))
    }

    async fn replace<K>(&self, namespace: &str, obj: &K) -> Result<K, Error>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let name = obj.name_any();
        self.api::<K>(namespace)
            .replace(&name, &self.post_params(), obj)
            .await
            .map_err(|e| write_error::<K>(namespace, &name, e))
    }
}

/// Map a 409 to [`Error::Conflict`]; pass everything else through
fn write_error<K>(namespace: &str, name: &str, err: kube::Error) -> Error
where
    K: Resource,
    <K as Resource>::DynamicType: Default,
{
    match err {
        kube::Error::Api(ref response) if response.code == CONFLICT => {
            Error::conflict(K::kind(&Default::default()), namespace, name)
        }
        other => Error::Kube(other),
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_arcus(&self, namespace: &str, name: &str) -> Result<Option<Arcus>, Error> {
        Ok(self.api::<Arcus>(namespace).get_opt(name).await?)
    }

    async fn update_arcus(&self, arcus: &Arcus) -> Result<Arcus, Error> {
        let namespace = arcus.identity()?.namespace().to_string();
        self.replace(&namespace, arcus).await
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ChildResource>, Error> {
        let child = match kind {
            ChildKind::ConfigMap => self
                .api::<ConfigMap>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::ConfigMap),
            ChildKind::PodDisruptionBudget => self
                .api::<PodDisruptionBudget>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::PodDisruptionBudget),
            ChildKind::Service => self
                .api::<Service>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::Service),
            ChildKind::StatefulSet => self
                .api::<StatefulSet>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::StatefulSet),
        };
        Ok(child)
    }

    async fn create_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> Result<ChildResource, Error> {
        let created = match child {
            ChildResource::ConfigMap(o) => ChildResource::ConfigMap(self.create(namespace, o).await?),
            ChildResource::PodDisruptionBudget(o) => {
                ChildResource::PodDisruptionBudget(self.create(namespace, o).await?)
            }
            ChildResource::Service(o) => ChildResource::Service(self.create(namespace, o).await?),
            ChildResource::StatefulSet(o) => {
                ChildResource::StatefulSet(self.create(namespace, o).await?)
            }
        };
        Ok(created)
    }

    async fn update_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> Result<ChildResource, Error> {
        let updated = match child {
            ChildResource::ConfigMap(o) => {
                ChildResource::ConfigMap(self.replace(namespace, o).await?)
            }
            ChildResource::PodDisruptionBudget(o) => {
                ChildResource::PodDisruptionBudget(self.replace(namespace, o).await?)
            }
            ChildResource::Service(o) => ChildResource::Service(self.replace(namespace, o).await?),
            ChildResource::StatefulSet(o) => {
                ChildResource::StatefulSet(self.replace(namespace, o).await?)
            }
        };
        Ok(updated)
    }
}
