//! Shared setup for the kind integration tests

use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, ObjectMeta, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use arcus_operator::crd::Arcus;

/// Namespace every integration test works in
pub const TEST_NAMESPACE: &str = "arcus-integration-test";

/// Connect to the current cluster and make sure the CRD and test namespace exist
pub async fn ensure_test_cluster() -> Result<Client, String> {
    let client = Client::try_default()
        .await
        .map_err(|e| format!("failed to create client: {e}"))?;
    let params = PatchParams::apply("arcus-integration-test").force();

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    crds.patch(Arcus::crd_name(), &params, &Patch::Apply(&Arcus::crd()))
        .await
        .map_err(|e| format!("failed to install CRD: {e}"))?;

    let namespaces: Api<Namespace> = Api::all(client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    namespaces
        .patch(TEST_NAMESPACE, &params, &Patch::Apply(&namespace))
        .await
        .map_err(|e| format!("failed to create namespace: {e}"))?;

    wait_for_crd(&crds).await?;
    Ok(client)
}

async fn wait_for_crd(crds: &Api<CustomResourceDefinition>) -> Result<(), String> {
    for _ in 0..30 {
        let crd = crds
            .get(Arcus::crd_name())
            .await
            .map_err(|e| format!("failed to read CRD: {e}"))?;
        let established = crd
            .status
            .and_then(|s| s.conditions)
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == "Established" && c.status == "True");
        if established {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    Err("CRD was not established in time".to_string())
}

/// Delete an Arcus left over from a previous run and wait for it to go away
pub async fn cleanup_arcus(client: &Client, name: &str) {
    let api: Api<Arcus> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let _ = api.delete(name, &DeleteParams::foreground()).await;
    for _ in 0..30 {
        if matches!(api.get_opt(name).await, Ok(None)) {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
