//! Runtime settings for the Arcus controller

use std::time::Duration;

/// Default interval between periodic resyncs of a converged Arcus
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(300);
/// Default delay before retrying a failed run
pub const DEFAULT_ERROR_REQUEUE: Duration = Duration::from_secs(10);
/// Delay before re-reading an Arcus whose defaults were just written
pub const DEFAULT_DEFAULTED_REQUEUE: Duration = Duration::from_secs(1);

/// Controller settings shared by every reconcile run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Requeue delay after a run that converged
    pub resync_interval: Duration,
    /// Requeue delay after a retryable failure
    pub error_requeue: Duration,
    /// Requeue delay after defaults were persisted
    pub defaulted_requeue: Duration,
    /// Cluster DNS domain used in peer hostnames
    pub cluster_domain: String,
    /// Field manager recorded on every write
    pub field_manager: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            error_requeue: DEFAULT_ERROR_REQUEUE,
            defaulted_requeue: DEFAULT_DEFAULTED_REQUEUE,
            cluster_domain: crate::DEFAULT_CLUSTER_DOMAIN.to_string(),
            field_manager: crate::OPERATOR_NAME.to_string(),
        }
    }
}
