//! Integration tests for CRD operations
//!
//! These tests tell the story of how users interact with Test resources
//! through the Kubernetes API, without a controller running.

use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};

use yaks_common::crd::{Test, TestPhase};

use super::helpers::{create_namespace, delete_namespace, ensure_test_cluster, sample_test};

#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_submits_a_test() {
    let client = ensure_test_cluster().await.unwrap();
    let ns = "yaks-crd-submit";
    create_namespace(&client, ns).await.unwrap();
    let tests: Api<Test> = Api::namespaced(client.clone(), ns);

    let created = tests
        .create(
            &PostParams::default(),
            &sample_test("hello", "Feature: hello"),
        )
        .await
        .expect("Test should be accepted");

    // A fresh Test has no phase yet
    assert_eq!(created.phase(), TestPhase::Unset);
    assert!(created.metadata.uid.is_some());

    let fetched = tests.get("hello").await.unwrap();
    assert_eq!(fetched.spec.source.name, "hello.feature");

    delete_namespace(&client, ns).await;
}

#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_status_is_a_subresource() {
    let client = ensure_test_cluster().await.unwrap();
    let ns = "yaks-crd-status";
    create_namespace(&client, ns).await.unwrap();
    let tests: Api<Test> = Api::namespaced(client.clone(), ns);

    let created = tests
        .create(&PostParams::default(), &sample_test("status", "Feature: s"))
        .await
        .unwrap();

    // A stale resourceVersion is rejected with a conflict
    let stale = serde_json::json!({
        "metadata": { "resourceVersion": "1" },
        "status": { "phase": "Pending" }
    });
    let result = tests
        .patch_status("status", &PatchParams::default(), &Patch::Merge(&stale))
        .await;
    assert!(matches!(result, Err(kube::Error::Api(e)) if e.code == 409));

    let fresh = serde_json::json!({
        "metadata": { "resourceVersion": created.metadata.resource_version },
        "status": { "phase": "Pending", "testID": "abc" }
    });
    let patched = tests
        .patch_status("status", &PatchParams::default(), &Patch::Merge(&fresh))
        .await
        .unwrap();
    assert_eq!(patched.phase(), TestPhase::Pending);
    assert_eq!(patched.test_id(), Some("abc"));

    delete_namespace(&client, ns).await;
}

#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_user_deletes_a_test() {
    let client = ensure_test_cluster().await.unwrap();
    let ns = "yaks-crd-delete";
    create_namespace(&client, ns).await.unwrap();
    let tests: Api<Test> = Api::namespaced(client.clone(), ns);

    tests
        .create(&PostParams::default(), &sample_test("bye", "Feature: bye"))
        .await
        .unwrap();
    tests.delete("bye", &DeleteParams::default()).await.unwrap();

    let result = tests.get_opt("bye").await.unwrap();
    assert!(result.is_none());

    delete_namespace(&client, ns).await;
}
