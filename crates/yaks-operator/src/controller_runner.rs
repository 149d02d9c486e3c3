//! Controller runner - builds the Test controller future
//!
//! Construction is kept separate from `main` so the wiring (watched
//! resources, scope, concurrency) can be inspected without a cluster.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Config as ControllerConfig;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use yaks_common::crd::Test;
use yaks_common::kube_utils::label_selector;
use yaks_common::{LABEL_APP, LABEL_APP_YAKS};
use yaks_test::{error_policy, reconcile, Context};

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Where and how fast the controller runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Namespace to watch, `None` for all namespaces
    pub namespace: Option<String>,
    /// Maximum concurrent reconciliations
    pub concurrency: u16,
}

/// Api handle for `K` scoped to the watched namespace
fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Watcher config for the worker Pods owned by Tests
fn pod_watcher_config() -> WatcherConfig {
    let labels = BTreeMap::from([(LABEL_APP.to_string(), LABEL_APP_YAKS.to_string())]);
    WatcherConfig::default()
        .labels(&label_selector(&labels))
        .timeout(WATCH_TIMEOUT_SECS)
}

/// Build the Test controller future
///
/// Worker Pods are watched through their owner reference, so a Pod finishing
/// triggers the owning Test right away.
pub fn build_test_controller(
    client: Client,
    ctx: Arc<Context>,
    settings: &RunnerSettings,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let namespace = settings.namespace.as_deref();
    let tests: Api<Test> = scoped_api(client.clone(), namespace);
    let pods: Api<Pod> = scoped_api(client, namespace);

    match namespace {
        Some(ns) => tracing::info!(namespace = %ns, "- Test controller (namespaced)"),
        None => tracing::info!("- Test controller (all namespaces)"),
    }

    Box::pin(
        Controller::new(tests, WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS))
            .owns(pods, pod_watcher_config())
            .with_config(ControllerConfig::default().concurrency(settings.concurrency))
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("Test")),
    )
}

/// Creates a closure for logging reconciliation results.
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
