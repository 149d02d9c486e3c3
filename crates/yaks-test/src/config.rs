//! Controller configuration
//!
//! Populated by the operator binary from its command line / environment.

use yaks_common::CONTROLLER_VERSION;

/// Image repository of the test runtime; tagged with the controller version
pub const DEFAULT_RUNTIME_REPOSITORY: &str = "docker.io/citrusframework/yaks";

/// Command the runtime container runs
pub const DEFAULT_RUNTIME_COMMAND: &[&str] = &[
    "mvn",
    "-B",
    "-q",
    "--no-transfer-progress",
    "-f",
    "/deployments/data/yaks-runtime-maven",
    "verify",
    "-Dit.test=org.citrusframework.yaks.feature.Yaks",
];

/// Status writes attempted before a conflict is surfaced
pub const DEFAULT_STATUS_RETRIES: u32 = 3;

/// Settings shared by every reconciliation
#[derive(Clone, Debug, PartialEq)]
pub struct TestControllerConfig {
    /// Image of the test runtime container
    pub runtime_image: String,
    /// Command of the test runtime container
    pub runtime_command: Vec<String>,
    /// Version stamped onto Tests and hashed into their digest
    pub controller_version: String,
    /// Optimistic-concurrency attempts for status writes
    pub status_retries: u32,
}

impl Default for TestControllerConfig {
    fn default() -> Self {
        Self {
            runtime_image: default_runtime_image(),
            runtime_command: DEFAULT_RUNTIME_COMMAND
                .iter()
                .map(|s| s.to_string())
                .collect(),
            controller_version: CONTROLLER_VERSION.to_string(),
            status_retries: DEFAULT_STATUS_RETRIES,
        }
    }
}

/// Runtime image matching this controller's version
pub fn default_runtime_image() -> String {
    format!("{}:{}", DEFAULT_RUNTIME_REPOSITORY, CONTROLLER_VERSION)
}
