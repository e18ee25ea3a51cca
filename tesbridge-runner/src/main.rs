//! Tesbridge Runner
//!
//! Runs a single job description on a Task Execution Service and prints its
//! outputs.
//!
//! The job is read from the JSON file named by `JOB_FILE`; every other
//! setting comes from the environment (see `RunnerConfig::from_env`).
//! Ctrl-C cancels outstanding polling; the job is still reported.

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tesbridge_client::TesClient;
use tesbridge_core::domain::job::{JobSpec, JobStatus};
use tesbridge_runner::{
    DirectoryListingCollector, FsAccess, JobRunner, LocalFsAccess, RunnerConfig, TaskService,
    WorkerRegistry,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tesbridge_runner=info,tesbridge_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Tesbridge Runner");

    let config = load_config()?;
    info!(
        "Loaded configuration: tes_url={}, poll_interval={:?}, poll_retries={}",
        config.tes_url, config.poll_interval, config.poll_retries
    );

    let job = load_job()?;

    let http_client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let service: Arc<dyn TaskService> =
        Arc::new(TesClient::with_client(config.tes_url.clone(), http_client));
    let fs: Arc<dyn FsAccess> = Arc::new(LocalFsAccess::new(config.basedir.clone()));

    let registry = WorkerRegistry::new();
    let runner = JobRunner::new(&config, service, Arc::clone(&fs), registry.clone());

    let interrupt = registry.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding workers");
            interrupt.cancel();
        }
    });

    let (outputs, status) = runner
        .run_and_wait(job, Arc::new(DirectoryListingCollector::new(fs)))
        .await
        .context("Job could not be described")?;

    let joined = registry.join_all().await;
    info!("{} worker(s) finished", joined);

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "status": status, "outputs": outputs }))?
    );

    if status == JobStatus::PermanentFail {
        anyhow::bail!("Job finished with status {}", status);
    }

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<RunnerConfig> {
    let config = match RunnerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            info!("{}, using defaults", e);
            RunnerConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Reads the job description named by `JOB_FILE`
fn load_job() -> Result<JobSpec> {
    let path = std::env::var("JOB_FILE").context("JOB_FILE environment variable not set")?;
    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read job file {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse job file {}", path))
}
