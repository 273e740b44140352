//! Integration tests for CRD operations
//!
//! These tests tell the story of how users interact with Arcus resources
//! through the Kubernetes API.

use kube::api::{Api, ObjectMeta, PostParams};

use arcus_operator::crd::{Arcus, ArcusSpec, LocalPeerAddress};

use super::helpers::{cleanup_arcus, ensure_test_cluster, TEST_NAMESPACE};

fn named_arcus(name: &str) -> Arcus {
    Arcus {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: ArcusSpec::default(),
    }
}

/// Story: a user applies an Arcus that names nothing but itself
///
/// The API server accepts it; every field is filled in later by the
/// controller rather than by the schema.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_creates_minimal_arcus() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Arcus> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-minimal";
    cleanup_arcus(&client, name).await;

    let created = api
        .create(&PostParams::default(), &named_arcus(name))
        .await
        .expect("failed to create arcus");

    assert!(created.metadata.uid.is_some());
    let fetched = api.get(name).await.expect("failed to get arcus");
    assert_eq!(fetched.spec, ArcusSpec::default());

    cleanup_arcus(&client, name).await;
}

/// Story: defaults written back by the controller survive a round trip
/// through the API server unchanged
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_defaulted_spec_is_persisted_verbatim() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Arcus> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-defaulted";
    cleanup_arcus(&client, name).await;

    let mut arcus = named_arcus(name);
    arcus.with_defaults();
    arcus.spec.zookeeper.configuration.local_peer_address = Some(LocalPeerAddress::Hostname);
    api.create(&PostParams::default(), &arcus)
        .await
        .expect("failed to create arcus");

    let mut fetched = api.get(name).await.expect("failed to get arcus");
    assert_eq!(fetched.spec, arcus.spec);
    assert!(!fetched.with_defaults(), "persisted defaults must be complete");

    cleanup_arcus(&client, name).await;
}
