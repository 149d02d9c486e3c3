//! YAKS Operator - runs Test resources as Pods in Kubernetes

use std::sync::Arc;

use clap::Parser;

use yaks_common::kube_utils::create_client;
use yaks_common::telemetry::init_telemetry;
use yaks_operator::cli::Cli;
use yaks_operator::controller_runner::{build_test_controller, RunnerSettings};
use yaks_operator::startup::{ensure_test_crd, test_crd_yaml};
use yaks_test::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install crypto provider before any TLS connection is made
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!(
            "CRITICAL: Failed to install aws-lc-rs crypto provider: {:?}. \
             The operator cannot talk to the API server without a TLS implementation.",
            e
        );
        std::process::exit(1);
    }

    let cli = Cli::parse();

    if cli.crd {
        println!("{}", test_crd_yaml()?);
        return Ok(());
    }

    init_telemetry(&cli.telemetry_config())
        .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {}", e))?;

    run_controller(cli).await
}

/// Install the CRD and run the Test controller until a shutdown signal
async fn run_controller(cli: Cli) -> anyhow::Result<()> {
    tracing::info!(
        version = yaks_common::CONTROLLER_VERSION,
        "Starting YAKS operator"
    );

    let client = create_client(cli.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("failed to create kube client: {}", e))?;

    ensure_test_crd(&client).await?;

    let config = cli.controller_config();
    tracing::info!(
        runtime_image = %config.runtime_image,
        status_retries = config.status_retries,
        concurrency = cli.concurrency,
        "Controller configuration"
    );

    let ctx = Arc::new(Context::new(client.clone(), config));
    let settings = RunnerSettings {
        namespace: cli.watch_namespace().map(str::to_string),
        concurrency: cli.concurrency,
    };

    tracing::info!("Starting controllers:");
    build_test_controller(client, ctx, &settings).await;

    tracing::info!("Shutting down");
    Ok(())
}
