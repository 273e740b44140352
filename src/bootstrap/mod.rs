//! Per-member ensemble bootstrap
//!
//! Every ZooKeeper member runs the same init script from the mounted
//! ConfigMap. The only free variable is the member's ordinal, which the
//! script recovers from its hostname at startup. From it the script writes:
//!
//! - `zoo.cfg`: tuning parameters, client port and data directory, then one
//!   `server.<id>=<address>:<server port>:<leader election port>` line per member
//! - `myid`: the member's server id (`ordinal + 1`)
//!
//! The Rust renderers in this module produce the same files the script does,
//! which is what the tests and the `render` command inspect.
//!
//! # Local peer address
//!
//! With [`LocalPeerAddress::Wildcard`] (the default) a member lists itself as
//! `0.0.0.0` so its quorum ports bind on every interface before its own DNS
//! record exists. [`LocalPeerAddress::Hostname`] lists every member, the local
//! one included, by its stable hostname.

mod ordinal;

use std::collections::BTreeMap;
use std::fmt;

use minijinja::{context, Environment};

use crate::crd::{EnsembleIdentity, LocalPeerAddress, ZookeeperSpec};
use crate::Error;

pub use ordinal::ReplicaOrdinal;

/// Mount path of the script ConfigMap
pub const SCRIPTS_DIR: &str = "/scripts";
/// ConfigMap key of the init script
pub const INIT_SCRIPT: &str = "arcus-zk-init.sh";
/// ConfigMap key of the health check script
pub const HEALTH_SCRIPT: &str = "arcus-zk-ok.sh";
/// Address a member uses for itself under the wildcard policy
pub const WILDCARD_ADDRESS: &str = "0.0.0.0";
/// Four letter word sent by the health check
pub const HEALTH_QUERY: &str = "ruok";
/// Reply from a healthy member
pub const HEALTH_TOKEN: &str = "imok";

const INIT_TEMPLATE: &str = include_str!("../../templates/arcus-zk-init.sh");
const HEALTH_TEMPLATE: &str = include_str!("../../templates/arcus-zk-ok.sh");

/// One `server.N=` line of zoo.cfg
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerEntry {
    /// Server id (ordinal + 1)
    pub server_id: u32,
    /// Address the member is reached at
    pub address: String,
    /// Peer replication port
    pub server_port: u16,
    /// Leader election port
    pub leader_election_port: u16,
}

impl PeerEntry {
    /// Whether this entry uses the wildcard address
    pub fn is_wildcard(&self) -> bool {
        self.address == WILDCARD_ADDRESS
    }
}

impl fmt::Display for PeerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "server.{}={}:{}:{}",
            self.server_id, self.address, self.server_port, self.leader_election_port
        )
    }
}

/// Bootstrap description of one ensemble
#[derive(Clone, Debug)]
pub struct EnsembleBootstrap<'a> {
    identity: &'a EnsembleIdentity,
    spec: &'a ZookeeperSpec,
    cluster_domain: &'a str,
}

impl<'a> EnsembleBootstrap<'a> {
    /// Bootstrap for a defaulted spec
    pub fn new(
        identity: &'a EnsembleIdentity,
        spec: &'a ZookeeperSpec,
        cluster_domain: &'a str,
    ) -> Self {
        Self {
            identity,
            spec,
            cluster_domain,
        }
    }

    /// Key/value settings written ahead of the peer lines
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let c = &self.spec.configuration;
        vec![
            ("maxClientCnxns", c.max_client_cnxns.to_string()),
            ("tickTime", c.tick_time.to_string()),
            ("initLimit", c.init_limit.to_string()),
            ("syncLimit", c.sync_limit.to_string()),
            ("minSessionTimeout", c.min_session_timeout.to_string()),
            ("maxSessionTimeout", c.max_session_timeout.to_string()),
            ("4lw.commands.whitelist", HEALTH_QUERY.to_string()),
            ("clientPort", self.spec.ports.client.to_string()),
            ("dataDir", self.spec.directory.data.clone()),
        ]
    }

    /// Peer list as seen by `local`, ordered by ordinal
    pub fn peers(&self, local: &ReplicaOrdinal) -> Vec<PeerEntry> {
        let domain = self.identity.service_domain(self.cluster_domain);
        let wildcard_local =
            self.spec.configuration.local_peer_address() == LocalPeerAddress::Wildcard;
        let replicas = u32::try_from(self.spec.replicas).unwrap_or(0);

        (0..replicas)
            .map(|i| {
                let address = if wildcard_local && i == local.ordinal() {
                    WILDCARD_ADDRESS.to_string()
                } else {
                    format!("{}-{i}.{domain}", local.base_name())
                };
                PeerEntry {
                    server_id: i + 1,
                    address,
                    server_port: self.spec.ports.server,
                    leader_election_port: self.spec.ports.leader_election,
                }
            })
            .collect()
    }

    /// Body of zoo.cfg written by the member `local`
    pub fn config_file(&self, local: &ReplicaOrdinal) -> String {
        let mut body = String::new();
        for (key, value) in self.settings() {
            body.push_str(&format!("{key}={value}\n"));
        }
        for peer in self.peers(local) {
            body.push_str(&format!("{peer}\n"));
        }
        body
    }

    /// Body of myid written by the member `local`
    pub fn identity_file(&self, local: &ReplicaOrdinal) -> String {
        format!("{}\n", local.server_id())
    }

    /// Init script that writes zoo.cfg and myid on the member it runs on
    pub fn init_script(&self) -> Result<String, Error> {
        let env = environment(INIT_SCRIPT, INIT_TEMPLATE)?;
        let rendered = env.get_template(INIT_SCRIPT)?.render(context! {
            ensemble => self.identity.name(),
            conf_dir => &self.spec.directory.conf,
            data_dir => &self.spec.directory.data,
            domain => self.identity.service_domain(self.cluster_domain),
            replicas => self.spec.replicas,
            server_port => self.spec.ports.server,
            leader_election_port => self.spec.ports.leader_election,
            wildcard_local => self.spec.configuration.local_peer_address() == LocalPeerAddress::Wildcard,
            wildcard_address => WILDCARD_ADDRESS,
            settings => self.settings(),
        })?;
        Ok(rendered)
    }

    /// Health check used by the readiness and liveness probes
    pub fn health_script(&self) -> Result<String, Error> {
        let env = environment(HEALTH_SCRIPT, HEALTH_TEMPLATE)?;
        let rendered = env.get_template(HEALTH_SCRIPT)?.render(context! {
            query => HEALTH_QUERY,
            token => HEALTH_TOKEN,
            client_port => self.spec.ports.client,
        })?;
        Ok(rendered)
    }

    /// Both scripts keyed by file name, as stored in the ConfigMap
    pub fn scripts(&self) -> Result<BTreeMap<String, String>, Error> {
        Ok(BTreeMap::from([
            (INIT_SCRIPT.to_string(), self.init_script()?),
            (HEALTH_SCRIPT.to_string(), self.health_script()?),
        ]))
    }
}

/// Absolute path of a script inside the container
pub fn script_path(script: &str) -> String {
    format!("{SCRIPTS_DIR}/{script}")
}

fn environment(
    name: &'static str,
    source: &'static str,
) -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env.add_template(name, source)?;
    Ok(env)
}
