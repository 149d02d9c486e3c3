//! Reading the outcome of a worker Pod

use k8s_openapi::api::core::v1::Pod;
use tracing::warn;

use yaks_common::crd::TestResults;

use crate::workload::CONTAINER_NAME;

/// What the worker Pod says about the run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodOutcome {
    /// Pod has not finished yet
    InProgress,
    /// Pod phase `Succeeded`
    Succeeded,
    /// Pod phase `Failed`
    Failed,
}

/// Map the Pod phase onto an outcome
pub fn pod_outcome(pod: &Pod) -> PodOutcome {
    match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
        Some("Succeeded") => PodOutcome::Succeeded,
        Some("Failed") => PodOutcome::Failed,
        _ => PodOutcome::InProgress,
    }
}

/// Termination message of the runtime container, if it terminated with one
pub fn termination_message(pod: &Pod) -> Option<&str> {
    pod.status
        .as_ref()?
        .container_statuses
        .as_ref()?
        .iter()
        .find(|cs| cs.name == CONTAINER_NAME)?
        .state
        .as_ref()?
        .terminated
        .as_ref()?
        .message
        .as_deref()
        .map(str::trim)
        .filter(|msg| !msg.is_empty())
}

/// Results and error entries collected from a finished Pod
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collected {
    /// Parsed runtime report
    pub results: Option<TestResults>,
    /// Entries to append to `status.errors`
    pub errors: Vec<String>,
}

/// Collect the runtime report from a finished Pod
///
/// A message that is not a results document is kept verbatim as an error
/// when the Pod failed, since it is then usually the log tail.
pub fn collect(pod: &Pod, outcome: PodOutcome) -> Collected {
    let Some(message) = termination_message(pod) else {
        return Collected::default();
    };

    match serde_json::from_str::<TestResults>(message) {
        Ok(results) => Collected {
            errors: results.error_messages(),
            results: Some(results),
        },
        Err(e) => {
            warn!(error = %e, "termination message is not a results document");
            let errors = if outcome == PodOutcome::Failed {
                vec![message.to_string()]
            } else {
                Vec::new()
            };
            Collected {
                results: None,
                errors,
            }
        }
    }
}
