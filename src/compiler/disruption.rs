//! PodDisruptionBudget

use k8s_openapi::api::policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::EnsembleCompiler;

/// Members that may be voluntarily disrupted at once
pub const MAX_UNAVAILABLE: i32 = 1;

pub(super) fn compile(compiler: &EnsembleCompiler<'_>) -> PodDisruptionBudget {
    PodDisruptionBudget {
        metadata: compiler.metadata(compiler.identity.pdb_name()),
        spec: Some(PodDisruptionBudgetSpec {
            max_unavailable: Some(IntOrString::Int(MAX_UNAVAILABLE)),
            selector: Some(LabelSelector {
                match_labels: Some(compiler.identity.selector_labels()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}
