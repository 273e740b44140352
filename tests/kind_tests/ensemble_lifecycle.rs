//! Integration tests for the ensemble reconcile loop
//!
//! Each story drives `reconcile_ensemble` against a real API server through
//! `KubeStore` and checks what ended up in the cluster.

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::{Client, ResourceExt};

use arcus_operator::child::ChildKind;
use arcus_operator::config::ControllerConfig;
use arcus_operator::controller::{reconcile_ensemble, KubeStore, ReconcileOutcome, SyncReport};
use arcus_operator::crd::{Arcus, ArcusSpec};
use arcus_operator::OPERATOR_NAME;

use super::helpers::{cleanup_arcus, ensure_test_cluster, TEST_NAMESPACE};

async fn create_arcus(client: &Client, name: &str) -> Arcus {
    let api: Api<Arcus> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let arcus = Arcus {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: ArcusSpec::default(),
    };
    api.create(&PostParams::default(), &arcus)
        .await
        .expect("failed to create arcus")
}

async fn run(client: &Client, name: &str) -> ReconcileOutcome {
    let store = KubeStore::new(client.clone(), OPERATOR_NAME);
    reconcile_ensemble(&store, &ControllerConfig::default(), TEST_NAMESPACE, name)
        .await
        .expect("reconcile failed")
}

fn synced(outcome: ReconcileOutcome) -> SyncReport {
    match outcome {
        ReconcileOutcome::Synced(report) => report,
        other => panic!("expected Synced, got {other:?}"),
    }
}

/// Story: a new Arcus becomes a full ensemble in two runs
///
/// The first run only writes defaults back. The second creates the scripts,
/// the disruption budget, the headless Service and the StatefulSet, each
/// owned by the Arcus.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_new_arcus_gets_all_four_children() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let name = "lifecycle-create";
    cleanup_arcus(&client, name).await;
    let arcus = create_arcus(&client, name).await;

    assert_eq!(run(&client, name).await, ReconcileOutcome::Defaulted);
    let report = synced(run(&client, name).await);
    assert_eq!(report.created, ChildKind::RECONCILE_ORDER.to_vec());

    let uid = arcus.uid().expect("arcus has a uid");
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let pdbs: Api<PodDisruptionBudget> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let services: Api<Service> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let statefulsets: Api<StatefulSet> = Api::namespaced(client.clone(), TEST_NAMESPACE);

    let cm = config_maps.get("lifecycle-create-cm").await.expect("config map");
    assert_eq!(cm.owner_references()[0].uid, uid);
    let data = cm.data.expect("scripts");
    assert!(data.contains_key("arcus-zk-init.sh"));
    assert!(data.contains_key("arcus-zk-ok.sh"));

    let pdb = pdbs.get("lifecycle-create-pdb").await.expect("pdb");
    assert_eq!(pdb.owner_references()[0].uid, uid);

    let svc = services
        .get("lifecycle-create-zk-headless-svc")
        .await
        .expect("service");
    assert_eq!(
        svc.spec.and_then(|s| s.cluster_ip).as_deref(),
        Some("None")
    );

    let sts = statefulsets.get("lifecycle-create-zk").await.expect("statefulset");
    let spec = sts.spec.expect("statefulset spec");
    assert_eq!(spec.replicas, Some(3));
    assert_eq!(spec.service_name, "lifecycle-create-zk-headless-svc");

    cleanup_arcus(&client, name).await;
}

/// Story: the controller re-runs on an ensemble that has not drifted
///
/// Server-side defaults on the children must not register as drift.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_converged_ensemble_is_left_alone() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let name = "lifecycle-steady";
    cleanup_arcus(&client, name).await;
    create_arcus(&client, name).await;
    run(&client, name).await;
    run(&client, name).await;

    let report = synced(run(&client, name).await);

    assert_eq!(report.writes(), 0);
    assert_eq!(report.unchanged, ChildKind::RECONCILE_ORDER.to_vec());

    cleanup_arcus(&client, name).await;
}

/// Story: the user scales out and the new member count reaches the scripts
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_scale_out_reaches_scripts_and_statefulset() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let name = "lifecycle-scale";
    cleanup_arcus(&client, name).await;
    create_arcus(&client, name).await;
    run(&client, name).await;
    run(&client, name).await;

    let api: Api<Arcus> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let mut arcus = api.get(name).await.expect("failed to get arcus");
    arcus.spec.zookeeper.replicas = 5;
    api.replace(name, &PostParams::default(), &arcus)
        .await
        .expect("failed to scale arcus");

    let report = synced(run(&client, name).await);

    assert!(report.updated.contains(&ChildKind::ConfigMap));
    assert!(report.updated.contains(&ChildKind::StatefulSet));
    let statefulsets: Api<StatefulSet> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let sts = statefulsets.get("lifecycle-scale-zk").await.expect("statefulset");
    assert_eq!(sts.spec.and_then(|s| s.replicas), Some(5));

    cleanup_arcus(&client, name).await;
}
