//! Start: materialize the workload of the current generation

use chrono::Utc;
use kube::ResourceExt;
use tracing::{debug, info};

use yaks_common::crd::{Test, TestPhase};

use crate::controller::Context;
use crate::error::TestError;
use crate::rbac::viewer_rbac;
use crate::workload::build_workload;

/// Apply viewer RBAC, the ConfigMap and the Pod, then mark the Test Running
///
/// Every object is server-side applied, so a Start that failed half-way is
/// simply repeated on the next reconciliation.
pub(super) async fn handle(test: &Test, ctx: &Context) -> Result<Option<Test>, TestError> {
    let namespace = test.namespace().ok_or(TestError::MissingNamespace)?;
    let workload = build_workload(test, &ctx.config)?;

    let rbac = viewer_rbac(&namespace);
    ctx.kube.apply_service_account(&rbac.service_account).await?;
    ctx.kube.apply_role(&rbac.role).await?;
    ctx.kube.apply_role_binding(&rbac.role_binding).await?;
    debug!(namespace = %namespace, "viewer RBAC applied");

    ctx.kube.apply_config_map(&workload.config_map).await?;
    ctx.kube.apply_pod(&workload.pod).await?;

    info!(
        test = %test.name_any(),
        pod = workload.pod.metadata.name.as_deref().unwrap_or_default(),
        "test workload applied"
    );

    let mut updated = test.clone();
    let status = updated.status_mut();
    status.phase = TestPhase::Running;
    status.started_at = Some(Utc::now());
    Ok(Some(updated))
}
