use crate::{
    cli::commands::{LoggingArgs, PredictCommand, ServerCommand, TrainCommand},
    config::{ServerSettings, ServiceConfig},
    models::{
        rating::eco_tips, storage::ArtifactStore, Dataset, EmissionRating, LinearRegressor,
    },
    server::{start_server, Readiness, ServerState},
};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tracing::info;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, fmt::time::ChronoUtc, EnvFilter};

/// Install the global subscriber.
///
/// The returned guard must be held for the life of the process when file
/// logging is enabled, or buffered lines are lost on exit.
pub fn init_logging(settings: &ServerSettings, args: &LoggingArgs) -> Result<Option<WorkerGuard>> {
    // Route `log` records from dependencies into tracing
    LogTracer::init().context("Failed to initialize log tracer")?;

    let level = args.verbosity_level().unwrap_or(settings.log_level.as_str());
    let filter = match &args.log_filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new(format!("{level},co2stream_core={level}")),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_timer(ChronoUtc::rfc_3339())
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true);

    match &settings.log_dir {
        Some(dir) => {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "co2stream.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let subscriber = builder.with_writer(non_blocking).with_ansi(false).compact().finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to install tracing subscriber")?;
            Ok(Some(guard))
        }
        None => {
            let subscriber = builder.with_writer(std::io::stderr).finish();
            tracing::subscriber::set_global_default(subscriber)
                .context("Failed to install tracing subscriber")?;
            Ok(None)
        }
    }
}

pub async fn handle_server(cmd: ServerCommand, mut config: ServiceConfig) -> Result<()> {
    if cmd.no_warmup {
        config.server.warmup = false;
    }

    let addr: SocketAddr = match &cmd.listen {
        Some(listen) => listen.parse::<SocketAddr>(),
        None => config.listen_addr().parse::<SocketAddr>(),
    }
    .context("Invalid listen address")?;

    info!(
        "Serving {:?} predictor, dataset {:?}",
        config.model.predictor, config.model.dataset_path
    );

    let state = ServerState::new(config).context("Failed to build server state")?;
    start_server(addr, state).await
}

pub async fn handle_train(cmd: TrainCommand, config: ServiceConfig) -> Result<()> {
    let model = config.model.clone();
    let force = cmd.force;

    let report = tokio::task::spawn_blocking(move || -> Result<serde_json::Value> {
        let store = ArtifactStore::new(model.artifact_dir.clone());
        if store.exists() && !force {
            if let Some(existing) = store.load()? {
                info!("Artifacts already present in {:?}, use --force to retrain", store.dir());
                return Ok(serde_json::json!({
                    "status": "existing",
                    "score": existing.score(),
                    "artifact_dir": store.dir(),
                }));
            }
        }

        let dataset = Dataset::load(&model.dataset_path)
            .with_context(|| format!("Failed to load dataset {:?}", model.dataset_path))?;
        let (regressor, report) = LinearRegressor::train(&dataset, model.test_fraction, model.ridge)
            .context("Training failed")?;
        store.save(&regressor).context("Failed to persist artifacts")?;

        let importance: serde_json::Map<String, serde_json::Value> = regressor
            .feature_importance()
            .into_iter()
            .map(|(name, weight)| (name.to_string(), serde_json::json!(weight)))
            .collect();

        Ok(serde_json::json!({
            "status": "trained",
            "score": report.score,
            "train_rows": report.train_rows,
            "test_rows": report.test_rows,
            "skipped_rows": dataset.skipped_rows,
            "mean_emission": report.mean_emission,
            "feature_importance": importance,
            "artifact_dir": store.dir(),
            "trained_at": chrono::Utc::now().to_rfc3339(),
        }))
    })
    .await
    .context("Training task failed")??;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub async fn handle_predict(cmd: PredictCommand, config: ServiceConfig) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(&cmd.json).context("Payload is not valid JSON")?;

    let state = ServerState::new(config).context("Failed to build server state")?;
    // Train or load before the request so it is not answered with the fallback
    match state.lifecycle.ensure_ready().await {
        Readiness::Ready(_) => {}
        Readiness::Initializing => anyhow::bail!("Model is still initializing"),
        Readiness::Failed(e) => anyhow::bail!("Model initialization failed: {}", e),
    }

    let response = state.orchestrator.handle_predict(&payload).await;
    let mut output = serde_json::to_value(&response)?;
    if cmd.insights {
        output["rating"] = serde_json::json!(EmissionRating::from_emission(response.prediction));
        output["tips"] = serde_json::json!(eco_tips(response.prediction));
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
