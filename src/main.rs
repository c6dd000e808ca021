use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use noshow_cli::shutdown_signal;
use noshow_core::config::paths_from_env_values;
use noshow_core::{CoreConfig, GenerationSettings, PredictionService, ProcessController};

/// Main entry point for the no-show prediction service
///
/// Loads the model artifact once, then serves the REST API until Ctrl-C or SIGTERM. A
/// generation session still running at shutdown is stopped before the process exits.
///
/// # Environment Variables
/// - `NOSHOW_REST_ADDR`: REST server address (default: "127.0.0.1:8000")
/// - `NOSHOW_DATASET_PATH`: dataset the generator streams into
/// - `NOSHOW_MODEL_PATH`: model artifact loaded at startup
/// - `NOSHOW_SEED_COUNT`, `NOSHOW_BATCH_SIZE`, `NOSHOW_INTERVAL_SECS`: generation cadence
/// - `NOSHOW_GENERATOR_BIN`: program launched for a generation session (default: "noshow")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("noshow=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("NOSHOW_REST_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into());

    let (dataset_path, model_path, generator_program) = paths_from_env_values(
        std::env::var("NOSHOW_DATASET_PATH").ok(),
        std::env::var("NOSHOW_MODEL_PATH").ok(),
        std::env::var("NOSHOW_GENERATOR_BIN").ok(),
    );
    let generation = GenerationSettings::from_env_values(
        std::env::var("NOSHOW_SEED_COUNT").ok(),
        std::env::var("NOSHOW_BATCH_SIZE").ok(),
        std::env::var("NOSHOW_INTERVAL_SECS").ok(),
    )?;
    let cfg = Arc::new(CoreConfig::new(
        dataset_path,
        model_path,
        generation,
        generator_program,
    )?);

    // Loaded once; a failure leaves the service up but unable to predict.
    let prediction = PredictionService::load(cfg.model_path());
    let state = AppState::new(prediction, ProcessController::from_config(&cfg));
    let controller = Arc::clone(&state.controller);

    tracing::info!("++ Starting no-show REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tokio::task::spawn_blocking(move || {
        let mut ctl = controller.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        ctl.stop_active();
    })
    .await?;

    tracing::info!("-- no-show REST stopped");
    Ok(())
}
