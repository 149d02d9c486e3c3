//! Integration tests for the Test lifecycle
//!
//! These tests run the controller in-process against the kind cluster. The
//! runtime image is replaced by busybox writing a results document to the
//! termination log, so a run takes seconds instead of a Maven build.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::Client;

use yaks_common::crd::{Test, TestPhase};
use yaks_common::kube_utils::label_selector;
use yaks_operator::controller_runner::{build_test_controller, RunnerSettings};
use yaks_test::{Context, TestControllerConfig};

use super::helpers::{
    create_namespace, delete_namespace, ensure_test_cluster, sample_test, wait_for_phase,
};

const PASSING_REPORT: &str = r#"{"summary":{"total":1,"passed":1},"tests":[{"name":"greets"}]}"#;

/// Controller configuration running busybox instead of the YAKS runtime
fn busybox_config(exit_code: u8) -> TestControllerConfig {
    TestControllerConfig {
        runtime_image: "busybox:1.36".to_string(),
        runtime_command: vec![
            "sh".to_string(),
            "-c".to_string(),
            format!(
                "echo '{}' > \"$YAKS_TERMINATION_LOG\"; exit {}",
                PASSING_REPORT, exit_code
            ),
        ],
        ..Default::default()
    }
}

/// Run the controller for `namespace` in the background
fn spawn_controller(client: Client, namespace: &str, config: TestControllerConfig) {
    let ctx = Arc::new(Context::new(client.clone(), config));
    let settings = RunnerSettings {
        namespace: Some(namespace.to_string()),
        concurrency: 2,
    };
    tokio::spawn(build_test_controller(client, ctx, &settings));
}

#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_test_runs_to_passed() {
    let client = ensure_test_cluster().await.unwrap();
    let ns = "yaks-lifecycle-pass";
    create_namespace(&client, ns).await.unwrap();
    spawn_controller(client.clone(), ns, busybox_config(0));

    let tests: Api<Test> = Api::namespaced(client.clone(), ns);
    tests
        .create(&PostParams::default(), &sample_test("hello", "Feature: hello"))
        .await
        .unwrap();

    let passed = wait_for_phase(&tests, "hello", TestPhase::Passed)
        .await
        .unwrap();
    let status = passed.status.clone().unwrap();
    let test_id = status.test_id.clone().unwrap();
    assert_eq!(status.results.map(|r| r.summary.passed), Some(1));
    assert!(status.digest.unwrap().starts_with('v'));

    // The workload of the generation is labelled and owned by the Test
    let labels = BTreeMap::from([
        ("app".to_string(), "yaks".to_string()),
        ("test-id".to_string(), test_id.clone()),
    ]);
    let pods: Api<Pod> = Api::namespaced(client.clone(), ns);
    let listed = pods
        .list(&ListParams::default().labels(&label_selector(&labels)))
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    let pod = &listed.items[0];
    assert_eq!(
        pod.metadata.name.as_deref(),
        Some(format!("test-hello-{test_id}").as_str())
    );
    let owner = &pod.metadata.owner_references.as_ref().unwrap()[0];
    assert_eq!(owner.kind, "Test");
    assert_eq!(Some(owner.uid.clone()), passed.metadata.uid);

    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), ns);
    let cm = config_maps
        .get(&format!("test-hello-{test_id}"))
        .await
        .unwrap();
    assert_eq!(cm.data.unwrap()["hello.feature"], "Feature: hello");

    delete_namespace(&client, ns).await;
}

#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_failing_run_is_reported() {
    let client = ensure_test_cluster().await.unwrap();
    let ns = "yaks-lifecycle-fail";
    create_namespace(&client, ns).await.unwrap();
    spawn_controller(client.clone(), ns, busybox_config(1));

    let tests: Api<Test> = Api::namespaced(client.clone(), ns);
    tests
        .create(&PostParams::default(), &sample_test("broken", "Feature: no"))
        .await
        .unwrap();

    let failed = wait_for_phase(&tests, "broken", TestPhase::Failed)
        .await
        .unwrap();
    assert!(failed.status.unwrap().completed_at.is_some());

    delete_namespace(&client, ns).await;
}

#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_edited_test_runs_again() {
    let client = ensure_test_cluster().await.unwrap();
    let ns = "yaks-lifecycle-rerun";
    create_namespace(&client, ns).await.unwrap();
    spawn_controller(client.clone(), ns, busybox_config(0));

    let tests: Api<Test> = Api::namespaced(client.clone(), ns);
    tests
        .create(&PostParams::default(), &sample_test("again", "Feature: one"))
        .await
        .unwrap();
    let first = wait_for_phase(&tests, "again", TestPhase::Passed)
        .await
        .unwrap();

    let edit = serde_json::json!({ "spec": { "source": { "content": "Feature: two" } } });
    tests
        .patch("again", &PatchParams::default(), &Patch::Merge(&edit))
        .await
        .unwrap();

    // Passed -> New -> Pending -> Running -> Passed under a new TestID
    let deadline = tokio::time::Instant::now() + super::helpers::PHASE_TIMEOUT;
    let second = loop {
        let current = tests.get("again").await.unwrap();
        if current.phase() == TestPhase::Passed && current.test_id() != first.test_id() {
            break current;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "Test was not re-run, still {}",
            current.phase()
        );
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    };
    assert_ne!(second.status.unwrap().digest, first.status.unwrap().digest);

    delete_namespace(&client, ns).await;
}
