//! Test result types reported by the worker runtime
//!
//! The runtime writes a `TestResults` JSON document to the container's
//! termination log; the controller copies it onto `TestStatus.results`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Aggregated counts over all scenarios of a run
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    /// Number of scenarios executed
    #[serde(default)]
    pub total: u32,
    /// Scenarios that passed
    #[serde(default)]
    pub passed: u32,
    /// Scenarios that failed
    #[serde(default)]
    pub failed: u32,
    /// Scenarios that were skipped
    #[serde(default)]
    pub skipped: u32,
    /// Scenarios left pending
    #[serde(default)]
    pub pending: u32,
    /// Scenarios with undefined steps
    #[serde(default)]
    pub undefined: u32,
    /// Scenarios that errored outside of an assertion
    #[serde(default)]
    pub errors: u32,
}

/// Outcome of a single scenario
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Scenario name
    pub name: String,
    /// Class or feature the scenario belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Error type, when the scenario failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Error message, when the scenario failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Results of a test run
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    /// Aggregated counts
    #[serde(default)]
    pub summary: TestSummary,
    /// Per-scenario detail
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestResult>,
}

impl TestResults {
    /// `<name>: <message>` for every scenario carrying an error message
    pub fn error_messages(&self) -> Vec<String> {
        self.tests
            .iter()
            .filter_map(|t| {
                t.error_message
                    .as_deref()
                    .map(|msg| format!("{}: {}", t.name, msg))
            })
            .collect()
    }
}
