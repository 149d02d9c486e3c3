//! Initialize: start a new generation

use chrono::Utc;
use kube::ResourceExt;
use tracing::{info, warn};
use uuid::Uuid;

use yaks_common::crd::{Test, TestPhase, TestStatus};

use crate::config::TestControllerConfig;
use crate::digest::compute_digest;

/// Stamp a fresh TestID, digest and version onto the Test
///
/// Results and errors of a previous generation are dropped. An invalid spec
/// goes straight to `Error`; the digest is still recorded so that editing
/// the source restarts the Test through Monitor.
pub(super) fn handle(test: &Test, config: &TestControllerConfig) -> Test {
    let test_id = Uuid::new_v4().to_string();
    let digest = compute_digest(&test.spec.source, &config.controller_version);

    let mut status = TestStatus {
        phase: TestPhase::Pending,
        test_id: Some(test_id),
        digest: Some(digest),
        version: Some(config.controller_version.clone()),
        ..Default::default()
    };

    if let Err(e) = test.validate() {
        warn!(test = %test.name_any(), error = %e, "invalid Test spec");
        status.phase = TestPhase::Error;
        status.errors = vec![e.to_string()];
        status.completed_at = Some(Utc::now());
    } else {
        info!(
            test = %test.name_any(),
            test_id = status.test_id.as_deref().unwrap_or_default(),
            "initialized Test"
        );
    }

    let mut updated = test.clone();
    updated.status = Some(status);
    updated
}
