//! Reconciliation actions for the Test state machine
//!
//! Each Test phase is handled by exactly one action:
//!
//! | Action     | Phases                  | Next phase                      |
//! |------------|-------------------------|---------------------------------|
//! | Initialize | unset, New              | Pending                         |
//! | Start      | Pending                 | Running                         |
//! | Evaluate   | Running                 | Passed / Failed / Error         |
//! | Monitor    | Passed, Failed, Error   | New when the digest changed     |
//! | Noop       | Updating, Deleting      | unchanged                       |
//!
//! `handle` returns `Ok(Some(test))` when the returned Test must be
//! persisted, `Ok(None)` when nothing changed, and `Err` when the action
//! failed. A failed action leaves the persisted Test as it was, so the next
//! reconciliation simply runs the same action again.

mod evaluate;
mod initialize;
mod monitor;
mod start;

use yaks_common::crd::{Test, TestPhase};

use crate::controller::Context;
use crate::error::TestError;

/// One step of the Test lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TestAction {
    /// Compute the digest and allocate a TestID
    Initialize,
    /// Materialize RBAC, ConfigMap and Pod
    Start,
    /// Read the worker Pod's outcome
    Evaluate,
    /// Restart a finished Test whose digest changed
    Monitor,
    /// Leave the Test to an external writer
    Noop,
}

impl TestAction {
    /// Every action, in selection order
    pub const ALL: [TestAction; 5] = [
        TestAction::Initialize,
        TestAction::Start,
        TestAction::Evaluate,
        TestAction::Monitor,
        TestAction::Noop,
    ];

    /// Lowercase name used in logs and metric labels
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Start => "start",
            Self::Evaluate => "evaluate",
            Self::Monitor => "monitor",
            Self::Noop => "noop",
        }
    }

    /// Whether this action is responsible for `phase`
    pub fn can_handle(&self, phase: TestPhase) -> bool {
        match self {
            Self::Initialize => phase.is_initial(),
            Self::Start => phase == TestPhase::Pending,
            Self::Evaluate => phase == TestPhase::Running,
            Self::Monitor => phase.is_terminal(),
            Self::Noop => matches!(phase, TestPhase::Updating | TestPhase::Deleting),
        }
    }

    /// First action, in [`TestAction::ALL`] order, that handles `phase`
    pub fn select(phase: TestPhase) -> Option<TestAction> {
        Self::ALL.into_iter().find(|action| action.can_handle(phase))
    }

    /// Run the action against `test`
    pub async fn handle(&self, test: &Test, ctx: &Context) -> Result<Option<Test>, TestError> {
        match self {
            Self::Initialize => Ok(Some(initialize::handle(test, &ctx.config))),
            Self::Start => start::handle(test, ctx).await,
            Self::Evaluate => evaluate::handle(test, ctx).await,
            Self::Monitor => Ok(monitor::handle(test, &ctx.config)),
            Self::Noop => Ok(None),
        }
    }
}

impl std::fmt::Display for TestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
