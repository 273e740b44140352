//! Arcus operator - reconciles ZooKeeper ensembles for Arcus cache clusters
//!
//! An `Arcus` custom resource declares an ensemble; the operator keeps four
//! child resources converged toward it: a ConfigMap holding the bootstrap and
//! health check scripts, a PodDisruptionBudget, a headless Service and the
//! StatefulSet running the members.
//!
//! # Modules
//!
//! - [`crd`] - The Arcus Custom Resource Definition, its defaults and derived names
//! - [`bootstrap`] - Per-member configuration and the scripts that write it
//! - [`compiler`] - Builds the four desired child resources from a defaulted spec
//! - [`sync`] - Copies owned fields from desired onto observed children
//! - [`child`] - The closed set of child kinds
//! - [`controller`] - Kubernetes controller reconciliation logic
//! - [`events`] - Kubernetes Event publishing
//! - [`config`] - Controller runtime settings
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod bootstrap;
pub mod child;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod events;
pub mod sync;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Name the operator reports as: field manager, event reporter and the
/// `app.kubernetes.io/managed-by` label value
pub const OPERATOR_NAME: &str = "arcus-operator";

/// Default cluster DNS domain used in peer hostnames
pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";
