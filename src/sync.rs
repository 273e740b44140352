//! Field-ownership aware synchronization of child resources
//!
//! [`Synchronize::synchronize`] copies only the fields this operator owns from
//! a freshly compiled object onto the live one. Everything else on the live
//! object (cluster IP, status, resource version, annotations other controllers
//! add) is left alone, so an update never fights another writer.
//!
//! | Kind                | Owned fields                                   |
//! |---------------------|------------------------------------------------|
//! | ConfigMap           | `data`, `binaryData`                           |
//! | Service             | `spec.ports`, `spec.type`                      |
//! | StatefulSet         | `spec.replicas`, `spec.template`, `spec.updateStrategy` |
//! | PodDisruptionBudget | `spec.maxUnavailable`, `spec.minAvailable`, `spec.selector` |

use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::policy::v1::PodDisruptionBudget;

/// Copy owned fields from a desired object onto an observed one
pub trait Synchronize {
    /// Overwrite the owned fields of `self` with those of `desired`.
    ///
    /// Returns true iff any owned field differed, i.e. iff a write is needed.
    fn synchronize(&mut self, desired: &Self) -> bool;
}

fn assign<T: PartialEq + Clone>(field: &mut T, desired: &T) -> bool {
    if field == desired {
        false
    } else {
        *field = desired.clone();
        true
    }
}

/// Synchronize an optional nested spec. A missing spec on either side reads
/// as an empty one; a missing observed spec is only materialized on change.
fn assign_nested<S: Default>(
    observed: &mut Option<S>,
    desired: Option<&S>,
    sync: impl Fn(&mut S, &S) -> bool,
) -> bool {
    let empty = S::default();
    let desired = desired.unwrap_or(&empty);
    if let Some(spec) = observed.as_mut() {
        return sync(spec, desired);
    }
    let mut spec = S::default();
    let changed = sync(&mut spec, desired);
    if changed {
        *observed = Some(spec);
    }
    changed
}

impl Synchronize for ConfigMap {
    fn synchronize(&mut self, desired: &Self) -> bool {
        assign(&mut self.data, &desired.data) | assign(&mut self.binary_data, &desired.binary_data)
    }
}

impl Synchronize for Service {
    fn synchronize(&mut self, desired: &Self) -> bool {
        assign_nested(&mut self.spec, desired.spec.as_ref(), |o, d| {
            assign(&mut o.ports, &d.ports) | assign(&mut o.type_, &d.type_)
        })
    }
}

impl Synchronize for StatefulSet {
    fn synchronize(&mut self, desired: &Self) -> bool {
        assign_nested(&mut self.spec, desired.spec.as_ref(), |o, d| {
            assign(&mut o.replicas, &d.replicas)
                | assign(&mut o.template, &d.template)
                | assign(&mut o.update_strategy, &d.update_strategy)
        })
    }
}

impl Synchronize for PodDisruptionBudget {
    fn synchronize(&mut self, desired: &Self) -> bool {
        assign_nested(&mut self.spec, desired.spec.as_ref(), |o, d| {
            assign(&mut o.max_unavailable, &d.max_unavailable)
                | assign(&mut o.min_available, &d.min_available)
                | assign(&mut o.selector, &d.selector)
        })
    }
}
