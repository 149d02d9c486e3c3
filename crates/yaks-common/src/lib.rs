//! Common types for YAKS: the Test CRD, errors, and Kubernetes utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;
pub mod metrics;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Version of the running controller, stamped onto every Test it initializes
pub const CONTROLLER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Field manager used for all server-side apply operations
pub const FIELD_MANAGER: &str = "yaks-operator";

/// Label key identifying resources created by YAKS
pub const LABEL_APP: &str = "app";

/// Value of the [`LABEL_APP`] label
pub const LABEL_APP_YAKS: &str = "yaks";

/// Label key carrying the owning Test name
pub const LABEL_TEST: &str = "test";

/// Label key carrying the TestID of the generation a resource belongs to
pub const LABEL_TEST_ID: &str = "test-id";
