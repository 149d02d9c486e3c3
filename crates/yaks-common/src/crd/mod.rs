//! Custom Resource Definitions for YAKS
//!
//! The operator owns a single CRD, `Test`, describing a test source and
//! carrying the observed run status.

mod results;

pub use results::{TestResult, TestResults, TestSummary};
pub use test::{
    Language, ResourceSpec, SettingsSpec, SourceSpec, Test, TestPhase, TestSpec, TestStatus,
    MAX_TEST_NAME_LEN,
};
