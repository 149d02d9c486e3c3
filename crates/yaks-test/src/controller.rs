//! Test controller implementation
//!
//! Selects the action responsible for a Test's phase, runs it, and persists
//! the status it computed. Status writes carry the observed
//! `resourceVersion`. On a conflict the Test is re-read and the action runs
//! again on the fresh copy, a bounded number of times; the write is
//! abandoned if the Test has moved to another phase in the meantime.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use yaks_common::crd::{Test, TestPhase};
use yaks_common::events::{EventPublisher, KubeEventPublisher, TestEvent};
use yaks_common::kube_utils::apply_params;
use yaks_common::metrics::{self, ReconcileResult};
use yaks_common::{Error, FIELD_MANAGER};

use crate::actions::TestAction;
use crate::config::TestControllerConfig;
use crate::error::TestError;

/// Requeue interval while a worker Pod is running
pub const RUNNING_REQUEUE: Duration = Duration::from_secs(15);
/// Requeue interval after a failed reconciliation
pub const ERROR_REQUEUE: Duration = Duration::from_secs(30);

/// Status keys written as `null` when unset so a merge patch clears them
const CLEARABLE_STATUS_KEYS: [&str; 7] = [
    "testID",
    "digest",
    "version",
    "results",
    "errors",
    "startedAt",
    "completedAt",
];

/// Trait abstracting the Kubernetes operations of the Test controller
///
/// Allows the actions and the reconcile loop to run against a mock or an
/// in-memory store in tests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Fetch a Test, `None` if it no longer exists
    async fn get_test(&self, namespace: &str, name: &str) -> Result<Option<Test>, Error>;

    /// Write `test.status`, guarded by `test.metadata.resourceVersion`
    ///
    /// Returns the persisted Test. A stale resourceVersion fails with a
    /// conflict (HTTP 409).
    async fn replace_test_status(&self, test: &Test) -> Result<Test, Error>;

    /// Fetch a Pod, `None` if it does not exist
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error>;

    /// Create or replace a ConfigMap
    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<(), Error>;

    /// Create or replace a Pod
    async fn apply_pod(&self, pod: &Pod) -> Result<(), Error>;

    /// Create or replace a ServiceAccount
    async fn apply_service_account(&self, service_account: &ServiceAccount) -> Result<(), Error>;

    /// Create or replace a Role
    async fn apply_role(&self, role: &Role) -> Result<(), Error>;

    /// Create or replace a RoleBinding
    async fn apply_role_binding(&self, role_binding: &RoleBinding) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Server-side apply a namespaced object
    async fn apply<K>(&self, object: &K) -> Result<(), Error>
    where
        K: Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + std::fmt::Debug,
    {
        let name = object.meta().name.as_deref().ok_or_else(|| {
            Error::internal_with_context("apply", format!("{} has no name", K::kind(&())))
        })?;
        let namespace = object.meta().namespace.as_deref().ok_or_else(|| {
            Error::internal_with_context("apply", format!("{} {} has no namespace", K::kind(&()), name))
        })?;

        let mut manifest = serde_json::to_value(object)?;
        manifest["apiVersion"] = K::api_version(&()).into();
        manifest["kind"] = K::kind(&()).into();

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &apply_params(), &Patch::Apply(&manifest))
            .await?;
        debug!(kind = %K::kind(&()), name, namespace, "applied");
        Ok(())
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_test(&self, namespace: &str, name: &str) -> Result<Option<Test>, Error> {
        let api: Api<Test> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn replace_test_status(&self, test: &Test) -> Result<Test, Error> {
        let namespace = test
            .namespace()
            .ok_or_else(|| Error::validation_for(test.name_any(), "Test has no namespace"))?;
        let api: Api<Test> = Api::namespaced(self.client.clone(), &namespace);

        let patch = status_patch(test)?;
        let persisted = api
            .patch_status(
                &test.name_any(),
                &PatchParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..Default::default()
                },
                &Patch::Merge(&patch),
            )
            .await?;
        Ok(persisted)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<(), Error> {
        self.apply(config_map).await
    }

    async fn apply_pod(&self, pod: &Pod) -> Result<(), Error> {
        self.apply(pod).await
    }

    async fn apply_service_account(&self, service_account: &ServiceAccount) -> Result<(), Error> {
        self.apply(service_account).await
    }

    async fn apply_role(&self, role: &Role) -> Result<(), Error> {
        self.apply(role).await
    }

    async fn apply_role_binding(&self, role_binding: &RoleBinding) -> Result<(), Error> {
        self.apply(role_binding).await
    }
}

/// Merge patch writing `test.status` under `test`'s resourceVersion
///
/// Unset optional status fields are sent as `null` so that values from a
/// previous generation are removed.
pub fn status_patch(test: &Test) -> Result<serde_json::Value, Error> {
    let mut status = serde_json::to_value(test.status.clone().unwrap_or_default())?;
    if let Some(fields) = status.as_object_mut() {
        for key in CLEARABLE_STATUS_KEYS {
            fields.entry(key).or_insert(serde_json::Value::Null);
        }
    }

    Ok(serde_json::json!({
        "metadata": { "resourceVersion": test.resource_version() },
        "status": status,
    }))
}

/// Shared context for the Test controller
pub struct Context {
    /// Kubernetes operations (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Kubernetes Event publisher
    pub events: Arc<dyn EventPublisher>,
    /// Controller settings
    pub config: TestControllerConfig,
}

impl Context {
    /// Create a context talking to the API server through `client`
    pub fn new(client: Client, config: TestControllerConfig) -> Self {
        Self {
            kube: Arc::new(KubeClientImpl::new(client.clone())),
            events: Arc::new(KubeEventPublisher::new(client)),
            config,
        }
    }

    /// Create a context for testing with a custom client
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn KubeClient>) -> Self {
        Self {
            kube,
            events: Arc::new(yaks_common::events::NoopEventPublisher),
            config: TestControllerConfig::default(),
        }
    }
}

/// Reconcile a Test resource
///
/// Runs the single action responsible for the Test's phase and persists
/// whatever status it computed.
#[instrument(
    skip(test, ctx),
    fields(test = %test.name_any(), namespace = %test.namespace().unwrap_or_default(), phase = %test.phase())
)]
pub async fn reconcile(test: Arc<Test>, ctx: Arc<Context>) -> Result<Action, TestError> {
    let phase = test.phase();
    let Some(action) = TestAction::select(phase) else {
        warn!("no action handles this phase");
        return Ok(Action::await_change());
    };
    debug!(action = %action, "reconciling Test");

    let started = Instant::now();
    let outcome = run_action(action, &test, &ctx).await;
    let result = if outcome.is_ok() {
        ReconcileResult::Success
    } else {
        ReconcileResult::Error
    };
    metrics::record_reconcile(action.name(), result, started.elapsed().as_secs_f64());

    let Some(persisted) = outcome? else {
        return Ok(requeue_for(phase));
    };

    let next = persisted.phase();
    if next != phase {
        info!(from = %phase, to = %next, "phase transition");
        metrics::record_phase_transition(next.as_str());
        publish_transition(&persisted, phase, &ctx).await;
    }
    Ok(requeue_for(next))
}

/// Run `action` on `observed` and write the status it computed
///
/// Returns the persisted Test, or `None` when the action changed nothing or
/// the write was abandoned because the Test was deleted or moved to another
/// phase concurrently. A conflicting write re-runs the action on the latest
/// copy of the Test, so the stored status always derives from the spec it
/// is stored next to.
pub async fn run_action(
    action: TestAction,
    observed: &Test,
    ctx: &Context,
) -> Result<Option<Test>, TestError> {
    let name = observed.name_any();
    let namespace = observed.namespace().ok_or(TestError::MissingNamespace)?;
    let observed_phase = observed.phase();
    let attempts = ctx.config.status_retries.max(1);

    let mut current = observed.clone();
    for attempt in 1..=attempts {
        let Some(updated) = action.handle(&current, ctx).await? else {
            return Ok(None);
        };

        match ctx.kube.replace_test_status(&updated).await {
            Ok(persisted) => return Ok(Some(persisted)),
            Err(e) if e.is_conflict() => {
                debug!(attempt, "status write conflicted, re-reading Test");
                match ctx.kube.get_test(&namespace, &name).await? {
                    Some(latest) if latest.phase() == observed_phase => current = latest,
                    Some(latest) => {
                        info!(
                            observed = %observed_phase,
                            current = %latest.phase(),
                            "Test changed phase concurrently, dropping status write"
                        );
                        return Ok(None);
                    }
                    None => {
                        debug!("Test deleted, dropping status write");
                        return Ok(None);
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::conflict(name, attempts).into())
}

/// Error policy for Test reconciliation
pub fn error_policy(test: Arc<Test>, error: &TestError, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        error_type = error.kind_label(),
        test = %test.name_any(),
        "test reconciliation failed"
    );
    Action::requeue(ERROR_REQUEUE)
}

fn requeue_for(phase: TestPhase) -> Action {
    match phase {
        TestPhase::Running => Action::requeue(RUNNING_REQUEUE),
        _ => Action::await_change(),
    }
}

/// Publish the Kubernetes Event describing a transition out of `from`
async fn publish_transition(test: &Test, from: TestPhase, ctx: &Context) {
    let to = test.phase();
    let Some(event) = TestEvent::for_transition(from, to) else {
        return;
    };

    let note = match test.status.as_ref() {
        Some(status) if !status.errors.is_empty() => Some(status.errors.join("; ")),
        Some(status) => status
            .test_id
            .as_ref()
            .map(|id| format!("{} -> {} (test id {})", from, to, id)),
        None => None,
    };

    ctx.events.publish(&test.object_ref(&()), event, note).await;
}
