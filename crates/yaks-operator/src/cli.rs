//! Command line of the operator binary

use std::path::PathBuf;

use clap::Parser;

use yaks_common::telemetry::TelemetryConfig;
use yaks_test::config::{default_runtime_image, DEFAULT_STATUS_RETRIES};
use yaks_test::TestControllerConfig;

/// YAKS operator - runs Test resources as Pods and reports their results
#[derive(Parser, Debug)]
#[command(name = "yaks-operator", version, about, long_about = None)]
pub struct Cli {
    /// Generate the Test CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    /// Only watch Tests in this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Image of the test runtime container
    #[arg(long, env = "YAKS_IMAGE", default_value_t = default_runtime_image())]
    pub runtime_image: String,

    /// Maximum number of Tests reconciled concurrently
    #[arg(long, env = "YAKS_CONCURRENCY", default_value_t = 4)]
    pub concurrency: u16,

    /// Attempts for a conflicting status write before giving up
    #[arg(long, env = "YAKS_STATUS_RETRIES", default_value_t = DEFAULT_STATUS_RETRIES)]
    pub status_retries: u32,

    /// Path to a kubeconfig file (in-cluster config when unset)
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// OTLP gRPC endpoint for traces and metrics (local logging only when unset)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log filter directive, e.g. `info,yaks=debug`
    #[arg(long, env = "RUST_LOG")]
    pub log_filter: Option<String>,
}

impl Cli {
    /// Controller settings derived from the command line
    pub fn controller_config(&self) -> TestControllerConfig {
        TestControllerConfig {
            runtime_image: self.runtime_image.clone(),
            status_retries: self.status_retries,
            ..Default::default()
        }
    }

    /// Logging and export settings
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            otlp_endpoint: self.otlp_endpoint.clone(),
            log_filter: self.log_filter.clone(),
        }
    }

    /// Namespace to watch, `None` for the whole cluster
    pub fn watch_namespace(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
    }
}
