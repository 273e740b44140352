//! Script ConfigMap

use k8s_openapi::api::core::v1::ConfigMap;

use super::EnsembleCompiler;
use crate::bootstrap::EnsembleBootstrap;
use crate::Error;

pub(super) fn compile(
    compiler: &EnsembleCompiler<'_>,
    bootstrap: &EnsembleBootstrap<'_>,
) -> Result<ConfigMap, Error> {
    Ok(ConfigMap {
        metadata: compiler.metadata(compiler.identity.config_map_name()),
        data: Some(bootstrap.scripts()?),
        ..Default::default()
    })
}
