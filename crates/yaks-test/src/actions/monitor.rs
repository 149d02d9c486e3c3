//! Monitor: restart finished Tests whose digest changed

use kube::ResourceExt;
use tracing::info;

use yaks_common::crd::{Test, TestPhase};

use crate::config::TestControllerConfig;
use crate::digest::compute_digest;

/// Put the Test back to `New` when its spec or the controller version changed
pub(super) fn handle(test: &Test, config: &TestControllerConfig) -> Option<Test> {
    let current = compute_digest(&test.spec.source, &config.controller_version);
    let stored = test.status.as_ref().and_then(|s| s.digest.as_deref());

    if stored == Some(current.as_str()) {
        return None;
    }

    info!(
        test = %test.name_any(),
        stored = stored.unwrap_or_default(),
        current = %current,
        "digest changed, restarting Test"
    );

    let mut updated = test.clone();
    updated.status_mut().phase = TestPhase::New;
    Some(updated)
}
