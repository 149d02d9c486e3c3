//! Test helpers for integration tests
//!
//! Provides utilities for managing the kind cluster and Test resources.

use std::collections::BTreeMap;
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Config};
use tokio::sync::OnceCell;
use tokio::time::{sleep, Instant};

use yaks_common::crd::{Language, SourceSpec, Test, TestPhase, TestSpec};

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "yaks-integration-test";

/// How long a story waits for the controller before failing
pub const PHASE_TIMEOUT: Duration = Duration::from_secs(180);

/// Global lock to ensure cluster is created only once
static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Track if CRD has been installed (async-safe)
static CRD_INSTALLED: OnceCell<Result<(), String>> = OnceCell::const_new();

/// Check if a kind cluster with the given name exists
pub fn kind_cluster_exists(name: &str) -> bool {
    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .expect("failed to run kind");

    let clusters = String::from_utf8_lossy(&output.stdout);
    clusters.lines().any(|line| line.trim() == name)
}

/// Create a kind cluster for testing
pub fn create_kind_cluster(name: &str) -> Result<(), String> {
    if kind_cluster_exists(name) {
        println!("Kind cluster '{name}' already exists, reusing it");
        return Ok(());
    }

    println!("Creating kind cluster '{name}'...");
    let output = Command::new("kind")
        .args(["create", "cluster", "--name", name, "--wait", "60s"])
        .output()
        .map_err(|e| format!("failed to run kind: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "failed to create kind cluster: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    println!("Kind cluster '{name}' created successfully");
    Ok(())
}

/// Create a Kubernetes client connected to the test cluster
pub async fn create_test_client() -> Result<Client, String> {
    let context_name = format!("kind-{TEST_CLUSTER_NAME}");

    let config = Config::from_kubeconfig(&kube::config::KubeConfigOptions {
        context: Some(context_name),
        ..Default::default()
    })
    .await
    .map_err(|e| format!("failed to load kubeconfig: {e}"))?;

    Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))
}

/// Ensure the test cluster is ready (cluster created once, CRD installed once)
///
/// Returns a fresh Client for each call - clients should not be shared across test threads.
pub async fn ensure_test_cluster() -> Result<Client, String> {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cluster_result = CLUSTER_INIT.get_or_init(|| create_kind_cluster(TEST_CLUSTER_NAME));
    cluster_result.clone()?;

    let client = create_test_client().await?;

    let crd_result = CRD_INSTALLED
        .get_or_init(|| async {
            let client = create_test_client().await?;
            yaks_operator::startup::ensure_test_crd(&client)
                .await
                .map_err(|e| format!("failed to install CRD: {e}"))?;
            // Wait for the CRD to be established
            sleep(Duration::from_secs(2)).await;
            Ok(())
        })
        .await;
    crd_result.clone()?;

    Ok(client)
}

/// Create a throwaway namespace for one story
pub async fn create_namespace(client: &Client, name: &str) -> Result<(), kube::Error> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                "yaks.citrusframework.org/integration".to_string(),
                "true".to_string(),
            )])),
            ..Default::default()
        },
        ..Default::default()
    };
    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
        Err(e) => Err(e),
    }
}

/// Delete a story namespace, ignoring errors
pub async fn delete_namespace(client: &Client, name: &str) {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let _ = namespaces.delete(name, &DeleteParams::default()).await;
}

/// A Test with a single feature source
pub fn sample_test(name: &str, content: &str) -> Test {
    Test::new(
        name,
        TestSpec {
            source: SourceSpec {
                name: format!("{name}.feature"),
                content: content.to_string(),
                language: Language::Feature,
            },
            ..Default::default()
        },
    )
}

/// Poll until the Test reaches `phase`
pub async fn wait_for_phase(
    tests: &Api<Test>,
    name: &str,
    phase: TestPhase,
) -> Result<Test, String> {
    let deadline = Instant::now() + PHASE_TIMEOUT;
    loop {
        let test = tests
            .get(name)
            .await
            .map_err(|e| format!("failed to get Test {name}: {e}"))?;
        if test.phase() == phase {
            return Ok(test);
        }
        if Instant::now() > deadline {
            return Err(format!(
                "Test {name} stuck in {} waiting for {phase}",
                test.phase()
            ));
        }
        sleep(Duration::from_secs(2)).await;
    }
}
