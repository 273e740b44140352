//! Headless Service giving every member a stable DNS name

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::EnsembleCompiler;

/// Client port name
pub const CLIENT_PORT_NAME: &str = "client";
/// Peer replication port name
pub const SERVER_PORT_NAME: &str = "server";
/// Leader election port name
pub const LEADER_ELECTION_PORT_NAME: &str = "leader-election";

pub(super) fn compile(compiler: &EnsembleCompiler<'_>) -> Service {
    let ports = &compiler.spec.ports;
    Service {
        metadata: compiler.metadata(compiler.identity.headless_service_name()),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: Some("None".to_string()),
            // Members must resolve each other before they can pass readiness.
            publish_not_ready_addresses: Some(true),
            selector: Some(compiler.identity.selector_labels()),
            ports: Some(vec![
                tcp_port(CLIENT_PORT_NAME, ports.client),
                tcp_port(SERVER_PORT_NAME, ports.server),
                tcp_port(LEADER_ELECTION_PORT_NAME, ports.leader_election),
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn tcp_port(name: &str, port: u16) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port: i32::from(port),
        target_port: Some(IntOrString::Int(i32::from(port))),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}
