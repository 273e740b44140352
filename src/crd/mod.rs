//! Custom Resource Definitions for the Arcus operator
//!
//! This module contains the Arcus CRD, its defaulting rules and the names
//! derived from it.

mod arcus;
pub mod defaults;
mod identity;
mod types;

pub use arcus::{Arcus, ArcusSpec};
pub use identity::{
    selector_labels_for, EnsembleIdentity, APP_NAME, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME,
};
pub use types::{
    ConfigurationSpec, DirectorySpec, ImageSpec, LocalPeerAddress, PodPolicySpec, PortsSpec,
    ZookeeperSpec,
};
