//! Controller implementation for the Arcus CRD
//!
//! Reconciliation follows the Kubernetes observe-diff-act loop: load the
//! Arcus, compile the four desired children, and converge what exists toward
//! them through an [`ObjectStore`].

mod arcus;
mod store;

pub use arcus::{
    error_policy, reconcile, reconcile_ensemble, ChildAction, Context, ContextBuilder,
    ReconcileOutcome, SyncReport,
};
pub use store::{KubeStore, ObjectStore};
