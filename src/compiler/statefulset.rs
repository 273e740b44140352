//! StatefulSet running the ensemble members

use k8s_openapi::api::apps::v1::{
    RollingUpdateStatefulSetStrategy, StatefulSet, StatefulSetSpec, StatefulSetUpdateStrategy,
};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, ExecAction, PodSecurityContext, PodSpec,
    PodTemplateSpec, Probe, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;

use super::service::{CLIENT_PORT_NAME, LEADER_ELECTION_PORT_NAME, SERVER_PORT_NAME};
use super::EnsembleCompiler;
use crate::bootstrap::{script_path, HEALTH_SCRIPT, INIT_SCRIPT, SCRIPTS_DIR};

/// Seconds before the first readiness/liveness probe
pub const PROBE_INITIAL_DELAY_SECONDS: i32 = 10;
/// Seconds before a probe attempt times out
pub const PROBE_TIMEOUT_SECONDS: i32 = 10;
/// Seconds between probe attempts
pub const PROBE_PERIOD_SECONDS: i32 = 10;
/// Consecutive successes before a failed probe counts as passing again
pub const PROBE_SUCCESS_THRESHOLD: i32 = 1;
/// Consecutive failures before a probe counts as failed
pub const PROBE_FAILURE_THRESHOLD: i32 = 3;
/// Scripts are executed directly from the volume
const SCRIPT_MODE: i32 = 0o755;

// Values the API server fills into an unset pod template. Setting them here
// keeps the compiled template equal to the stored one.
const RESTART_POLICY: &str = "Always";
const DNS_POLICY: &str = "ClusterFirst";
const SCHEDULER_NAME: &str = "default-scheduler";
const TERMINATION_MESSAGE_PATH: &str = "/dev/termination-log";
const TERMINATION_MESSAGE_POLICY: &str = "File";

pub(super) fn compile(compiler: &EnsembleCompiler<'_>) -> StatefulSet {
    let identity = compiler.identity;
    StatefulSet {
        metadata: compiler.metadata(identity.statefulset_name()),
        spec: Some(StatefulSetSpec {
            replicas: Some(compiler.spec.replicas),
            service_name: identity.headless_service_name(),
            selector: LabelSelector {
                match_labels: Some(identity.selector_labels()),
                ..Default::default()
            },
            update_strategy: Some(StatefulSetUpdateStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateStatefulSetStrategy {
                    partition: Some(0),
                    ..Default::default()
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(identity.selector_labels()),
                    ..Default::default()
                }),
                spec: Some(pod_spec(compiler)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_spec(compiler: &EnsembleCompiler<'_>) -> PodSpec {
    let pod = &compiler.spec.pod;
    PodSpec {
        node_selector: (!pod.node_selector.is_empty()).then(|| pod.node_selector.clone()),
        affinity: pod.affinity.clone(),
        tolerations: (!pod.tolerations.is_empty()).then(|| pod.tolerations.clone()),
        termination_grace_period_seconds: Some(pod.termination_grace_period_seconds),
        restart_policy: Some(RESTART_POLICY.to_string()),
        dns_policy: Some(DNS_POLICY.to_string()),
        scheduler_name: Some(SCHEDULER_NAME.to_string()),
        security_context: Some(PodSecurityContext::default()),
        containers: vec![container(compiler)],
        volumes: Some(vec![Volume {
            name: compiler.identity.volume_name(),
            config_map: Some(ConfigMapVolumeSource {
                name: compiler.identity.config_map_name(),
                default_mode: Some(SCRIPT_MODE),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn container(compiler: &EnsembleCompiler<'_>) -> Container {
    let spec = compiler.spec;
    let start = format!(
        "{} && {}/bin/zkServer.sh start-foreground",
        script_path(INIT_SCRIPT),
        spec.directory.home
    );
    Container {
        name: compiler.identity.statefulset_name(),
        image: Some(spec.image.name.clone()),
        image_pull_policy: Some(spec.image.pull_policy.clone()),
        command: Some(vec!["/bin/bash".to_string()]),
        args: Some(vec!["-c".to_string(), start]),
        ports: Some(vec![
            container_port(CLIENT_PORT_NAME, spec.ports.client),
            container_port(SERVER_PORT_NAME, spec.ports.server),
            container_port(LEADER_ELECTION_PORT_NAME, spec.ports.leader_election),
        ]),
        env: (!spec.pod.env.is_empty()).then(|| spec.pod.env.clone()),
        resources: spec.pod.resources.clone(),
        readiness_probe: Some(health_probe()),
        liveness_probe: Some(health_probe()),
        volume_mounts: Some(vec![VolumeMount {
            name: compiler.identity.volume_name(),
            mount_path: SCRIPTS_DIR.to_string(),
            ..Default::default()
        }]),
        termination_message_path: Some(TERMINATION_MESSAGE_PATH.to_string()),
        termination_message_policy: Some(TERMINATION_MESSAGE_POLICY.to_string()),
        ..Default::default()
    }
}

fn container_port(name: &str, port: u16) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: i32::from(port),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

fn health_probe() -> Probe {
    Probe {
        exec: Some(ExecAction {
            command: Some(vec![script_path(HEALTH_SCRIPT)]),
        }),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECONDS),
        timeout_seconds: Some(PROBE_TIMEOUT_SECONDS),
        period_seconds: Some(PROBE_PERIOD_SECONDS),
        success_threshold: Some(PROBE_SUCCESS_THRESHOLD),
        failure_threshold: Some(PROBE_FAILURE_THRESHOLD),
        ..Default::default()
    }
}
