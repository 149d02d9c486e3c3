//! Kubernetes Events recorded on Tests
//!
//! Every phase transition worth telling a user about maps to one
//! [`TestEvent`], visible in `kubectl describe test <name>`. Publishing is
//! best effort: a failed Event is logged and never fails reconciliation.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
use tracing::warn;

use crate::crd::TestPhase;
use crate::FIELD_MANAGER;

/// Lifecycle event of a Test
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestEvent {
    /// A new generation got its TestID and digest
    Initialized,
    /// The spec was refused during initialization
    InvalidSpec,
    /// Worker Pod and ConfigMap were applied
    Started,
    /// Worker Pod succeeded
    Passed,
    /// Worker Pod failed
    Failed,
    /// The run could not be evaluated
    Errored,
    /// Spec or controller version changed after completion
    Restarted,
}

impl TestEvent {
    /// Event describing a move from `from` to `to`
    pub fn for_transition(from: TestPhase, to: TestPhase) -> Option<Self> {
        match to {
            TestPhase::Pending => Some(Self::Initialized),
            TestPhase::Error if from.is_initial() => Some(Self::InvalidSpec),
            TestPhase::Error => Some(Self::Errored),
            TestPhase::Running => Some(Self::Started),
            TestPhase::Passed => Some(Self::Passed),
            TestPhase::Failed => Some(Self::Failed),
            TestPhase::New => Some(Self::Restarted),
            _ => None,
        }
    }

    /// REASON column of `kubectl get events`
    pub fn reason(self) -> &'static str {
        match self {
            Self::Initialized => "TestInitialized",
            Self::InvalidSpec => "ValidationFailed",
            Self::Started => "TestStarted",
            Self::Passed => "TestPassed",
            Self::Failed => "TestFailed",
            Self::Errored => "TestError",
            Self::Restarted => "TestRestarted",
        }
    }

    /// Reconciliation action that produced the event
    pub fn action(self) -> &'static str {
        match self {
            Self::Initialized | Self::InvalidSpec => "Initialize",
            Self::Started => "Start",
            Self::Passed | Self::Failed | Self::Errored => "Evaluate",
            Self::Restarted => "Monitor",
        }
    }

    /// Warning for anything that did not go to plan
    pub fn event_type(self) -> EventType {
        match self {
            Self::InvalidSpec | Self::Failed | Self::Errored => EventType::Warning,
            _ => EventType::Normal,
        }
    }
}

/// Sink for Test events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Record `event` on the Test behind `test`
    async fn publish(&self, test: &ObjectReference, event: TestEvent, note: Option<String>);
}

/// Publisher backed by `kube::runtime::events::Recorder`
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Report as the operator, tagged with the operator Pod's name when known
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: FIELD_MANAGER.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(&self, test: &ObjectReference, event: TestEvent, note: Option<String>) {
        let record = Event {
            type_: event.event_type(),
            reason: event.reason().to_string(),
            note,
            action: event.action().to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&record, test).await {
            warn!(reason = event.reason(), error = %e, "failed to publish Test event");
        }
    }
}

/// Publisher that drops every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _test: &ObjectReference, _event: TestEvent, _note: Option<String>) {}
}
