use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use shift_pipeline::bus::{InMemoryTopic, StateEstimateTrigger, WatchEventsTrigger};
use shift_pipeline::config::{self, PipelineConfig};
use shift_pipeline::estimator::{self, DefaultTransform};
use shift_pipeline::identity::{IdentityVerifier, MockVerifier};
use shift_pipeline::push::{NullProvider, PushProvider};
use shift_pipeline::selector::{self, SelectorThresholds};
use shift_pipeline::storage::{Catalog, Warehouse};
use shift_pipeline::{api, background};

/// Command-line flags for the pipeline binary.
#[derive(Parser, Debug)]
#[command(name = "shift-pipeline", about = "Behavioral-intervention pipeline")]
struct CliArgs {
    /// Address to bind the HTTP server to. Overrides the config file value.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Path to the warehouse directory. Overrides the config file value.
    #[arg(long)]
    warehouse_path: Option<String>,

    /// Destroy and recreate the warehouse directory before starting.
    #[arg(long)]
    reset_db: bool,

    /// Load the intervention catalog from this path instead of the
    /// configured default.
    #[arg(long)]
    seed_catalog: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    StateEstimator,
    InterventionSelector,
    BackgroundMaintenance,
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskName::HttpServer => "http_server",
            TaskName::StateEstimator => "state_estimator",
            TaskName::InterventionSelector => "intervention_selector",
            TaskName::BackgroundMaintenance => "background_maintenance",
        };
        f.write_str(name)
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("SHIFT_LOG_JSON").is_ok() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn reset_data_directory(path: &str) -> Result<()> {
    let dir = Path::new(path);
    if dir.exists() {
        tracing::warn!(path, "reset_db requested — removing existing warehouse directory");
        std::fs::remove_dir_all(dir).with_context(|| format!("removing warehouse directory at {path}"))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let mut pipeline_config = PipelineConfig::load().context("loading pipeline configuration")?;
    if let Some(bind_addr) = args.bind_addr {
        pipeline_config.bind_addr = bind_addr;
    }
    if let Some(warehouse_path) = args.warehouse_path {
        pipeline_config.warehouse_path = warehouse_path;
    }
    if let Some(catalog_path) = args.seed_catalog {
        pipeline_config.catalog_path = catalog_path;
    }

    if args.reset_db {
        reset_data_directory(&pipeline_config.warehouse_path)?;
    }

    let warehouse = Arc::new(
        Warehouse::open(&pipeline_config.warehouse_path)
            .with_context(|| format!("opening warehouse at {}", pipeline_config.warehouse_path))?,
    );
    let catalog = Arc::new(
        Catalog::load(&pipeline_config.catalog_path)
            .with_context(|| format!("loading catalog at {}", pipeline_config.catalog_path))?,
    );

    let thresholds = SelectorThresholds::from(&pipeline_config);
    config::init(pipeline_config);

    let identity: Arc<dyn IdentityVerifier> = Arc::new(MockVerifier);
    let push: Arc<dyn PushProvider> = Arc::new(NullProvider);

    let (watch_events_topic, mut watch_events_rx) = InMemoryTopic::<WatchEventsTrigger>::new(256);
    let (state_estimates_topic, state_estimates_rx) = InMemoryTopic::<StateEstimateTrigger>::new(256);

    // Drain the watch_events consumer side so the estimator worker sees
    // published triggers too — the estimator actually polls the warehouse
    // directly each tick, so this channel only needs a receiver alive to
    // keep `publish` from failing; nothing further need act on it here.
    tokio::spawn(async move { while watch_events_rx.recv().await.is_some() {} });

    let api_state = api::ApiState {
        warehouse: warehouse.clone(),
        catalog: catalog.clone(),
        identity,
        watch_events_bus: Arc::new(watch_events_topic),
    };
    let bind_addr = config::get().bind_addr.clone();
    let app = api::api_routes(api_state);

    let cancel_token = CancellationToken::new();
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    {
        let cancel = cancel_token.clone();
        task_set.spawn(async move {
            let listener = tokio::net::TcpListener::bind(&bind_addr)
                .await
                .with_context(|| format!("binding HTTP listener on {bind_addr}"))?;
            tracing::info!(%bind_addr, "http server listening");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await
                .context("http server failed")?;
            Ok(TaskName::HttpServer)
        });
    }

    {
        let warehouse = warehouse.clone();
        let bus: Arc<dyn shift_pipeline::bus::MessageBus<StateEstimateTrigger>> = Arc::new(state_estimates_topic);
        let transform = Arc::new(DefaultTransform);
        let tick = Duration::from_secs(config::get().estimator_tick_secs);
        let cancel = cancel_token.clone();
        task_set.spawn(async move {
            estimator::run(warehouse, bus, transform, tick, cancel).await?;
            Ok(TaskName::StateEstimator)
        });
    }

    {
        let warehouse = warehouse.clone();
        let catalog = catalog.clone();
        let cancel = cancel_token.clone();
        task_set.spawn(async move {
            selector::run(warehouse, catalog, push, thresholds, state_estimates_rx, cancel).await?;
            Ok(TaskName::InterventionSelector)
        });
    }

    {
        let warehouse = warehouse.clone();
        let cancel = cancel_token.clone();
        task_set.spawn(async move {
            background::run(warehouse, Duration::from_secs(60), cancel).await?;
            Ok(TaskName::BackgroundMaintenance)
        });
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal");
                cancel_token.cancel();
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(name))) => {
                        tracing::info!(task = %name, "task exited");
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!(error = %e, "task failed, shutting down");
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(join_err)) => {
                        tracing::error!(error = %join_err, "task panicked");
                        cancel_token.cancel();
                        return Err(join_err.into());
                    }
                    None => {
                        tracing::info!("all tasks exited");
                        return Ok(());
                    }
                }
            }
        }
    }
}
