//! CRD installation
//!
//! The operator installs the Test CRD on startup using server-side apply, so
//! the schema in the cluster always matches the running controller.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch};
use kube::{Client, CustomResourceExt};

use yaks_common::crd::Test;
use yaks_common::kube_utils::apply_params;

use super::retry::{with_backoff, Backoff};

/// The Test CRD manifest
pub fn test_crd() -> CustomResourceDefinition {
    Test::crd()
}

/// Test CRD rendered as YAML
pub fn test_crd_yaml() -> anyhow::Result<String> {
    serde_yaml::to_string(&test_crd())
        .map_err(|e| anyhow::anyhow!("failed to serialize CRD: {}", e))
}

/// Ensure the Test CRD is installed and up to date
pub async fn ensure_test_crd(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let crd = test_crd();
    let name = Test::crd_name();
    let params = apply_params();
    let (crds, crd, params) = (&crds, &crd, &params);

    tracing::info!(crd = name, "Installing Test CRD...");
    with_backoff(
        &Backoff::CRD_INSTALL,
        "install_test_crd",
        move || async move { crds.patch(name, params, &Patch::Apply(crd)).await },
    )
    .await
    .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", name, e))?;
    tracing::info!(crd = name, "Test CRD installed/updated");

    Ok(())
}
