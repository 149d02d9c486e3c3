//! Evaluate: turn the worker Pod's outcome into a terminal phase

use chrono::Utc;
use kube::ResourceExt;
use tracing::{debug, info, warn};

use yaks_common::crd::{Test, TestPhase, TestResults};

use crate::controller::Context;
use crate::error::TestError;
use crate::results::{collect, pod_outcome, PodOutcome};
use crate::workload::generation_name;

pub(super) async fn handle(test: &Test, ctx: &Context) -> Result<Option<Test>, TestError> {
    let name = test.name_any();
    let namespace = test.namespace().ok_or(TestError::MissingNamespace)?;

    let Some(test_id) = test.test_id() else {
        warn!(test = %name, "running Test has no TestID");
        return Ok(Some(finish(
            test,
            TestPhase::Error,
            None,
            vec!["test is running without a TestID".to_string()],
        )));
    };

    let pod_name = generation_name(&name, test_id);
    let Some(pod) = ctx.kube.get_pod(&namespace, &pod_name).await? else {
        warn!(test = %name, pod = %pod_name, "test pod not found");
        return Ok(Some(finish(
            test,
            TestPhase::Error,
            None,
            vec![format!("test pod {} not found", pod_name)],
        )));
    };

    let outcome = pod_outcome(&pod);
    let phase = match outcome {
        PodOutcome::InProgress => {
            debug!(test = %name, pod = %pod_name, "test pod still running");
            return Ok(None);
        }
        PodOutcome::Succeeded => TestPhase::Passed,
        PodOutcome::Failed => TestPhase::Failed,
    };

    let collected = collect(&pod, outcome);
    info!(
        test = %name,
        phase = %phase,
        errors = collected.errors.len(),
        "test finished"
    );
    Ok(Some(finish(test, phase, collected.results, collected.errors)))
}

fn finish(
    test: &Test,
    phase: TestPhase,
    results: Option<TestResults>,
    errors: Vec<String>,
) -> Test {
    let mut updated = test.clone();
    let status = updated.status_mut();
    status.phase = phase;
    status.results = results;
    status.errors.extend(errors);
    status.completed_at = Some(Utc::now());
    updated
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::actions::test_support::{test_in, test_with_status};
    use crate::controller::MockKubeClient;
    use crate::workload::CONTAINER_NAME;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateTerminated, ContainerStatus, Pod, PodStatus,
    };
    use yaks_common::crd::TestStatus;

    fn pod(phase: &str, message: Option<&str>) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                container_statuses: Some(vec![ContainerStatus {
                    name: CONTAINER_NAME.to_string(),
                    state: message.map(|m| ContainerState {
                        terminated: Some(ContainerStateTerminated {
                            exit_code: 1,
                            message: Some(m.to_string()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn ctx_with_pod(pod: Option<Pod>) -> Context {
        let mut mock = MockKubeClient::new();
        mock.expect_get_pod()
            .withf(|ns, name| ns == "default" && name == "test-hello-abc")
            .returning(move |_, _| Ok(pod.clone()));
        Context::for_testing(Arc::new(mock))
    }

    #[tokio::test]
    async fn running_pod_changes_nothing() {
        let ctx = ctx_with_pod(Some(pod("Running", None)));
        let result = handle(&test_in(TestPhase::Running), &ctx).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn succeeded_pod_passes() {
        let ctx = ctx_with_pod(Some(pod(
            "Succeeded",
            Some(r#"{"summary":{"total":1,"passed":1}}"#),
        )));
        let updated = handle(&test_in(TestPhase::Running), &ctx)
            .await
            .unwrap()
            .unwrap();

        let status = updated.status.unwrap();
        assert_eq!(status.phase, TestPhase::Passed);
        assert_eq!(status.results.map(|r| r.summary.passed), Some(1));
        assert!(status.errors.is_empty());
        assert!(status.completed_at.is_some());
    }

    #[tokio::test]
    async fn failed_pod_fails_with_scenario_errors() {
        let report = r#"{"summary":{"total":1,"failed":1},
            "tests":[{"name":"greets","errorMessage":"expected hello"}]}"#;
        let ctx = ctx_with_pod(Some(pod("Failed", Some(report))));
        let updated = handle(&test_in(TestPhase::Running), &ctx)
            .await
            .unwrap()
            .unwrap();

        let status = updated.status.unwrap();
        assert_eq!(status.phase, TestPhase::Failed);
        assert_eq!(status.errors, vec!["greets: expected hello"]);
    }

    #[tokio::test]
    async fn missing_pod_is_an_error() {
        let ctx = ctx_with_pod(None);
        let updated = handle(&test_in(TestPhase::Running), &ctx)
            .await
            .unwrap()
            .unwrap();

        let status = updated.status.unwrap();
        assert_eq!(status.phase, TestPhase::Error);
        assert_eq!(status.errors, vec!["test pod test-hello-abc not found"]);
    }

    #[tokio::test]
    async fn running_without_test_id_is_an_error() {
        let mut mock = MockKubeClient::new();
        mock.expect_get_pod().never();
        let ctx = Context::for_testing(Arc::new(mock));

        let test = test_with_status(Some(TestStatus::with_phase(TestPhase::Running)));
        let updated = handle(&test, &ctx).await.unwrap().unwrap();
        assert_eq!(updated.phase(), TestPhase::Error);
    }

    #[tokio::test]
    async fn store_errors_propagate() {
        let mut mock = MockKubeClient::new();
        mock.expect_get_pod()
            .returning(|_, _| {
                Err(yaks_common::Error::internal_with_context("kube", "connection reset"))
            });
        let ctx = Context::for_testing(Arc::new(mock));

        assert!(handle(&test_in(TestPhase::Running), &ctx).await.is_err());
    }
}
