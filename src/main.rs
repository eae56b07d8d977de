use std::path::PathBuf;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use medinfo_core::config::{
    fallback_timeout_from_env_value, ocr_command_from_env_value, summary_endpoint_from_env_value,
};
use medinfo_core::constants::DEFAULT_DATA_DIR;
use medinfo_core::{CoreConfig, Services};

/// Main entry point for the MedInfo server
///
/// Resolves configuration from the environment once, opens the persisted store and serves the
/// REST API (with Swagger UI at `/swagger-ui`).
///
/// # Environment Variables
/// - `MEDINFO_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDINFO_DATA_DIR`: Directory holding `storage.json` (default: "medinfo_data")
/// - `MEDINFO_SUMMARY_ENDPOINT`: Encyclopedia summary endpoint (default: Wikipedia)
/// - `MEDINFO_FALLBACK_TIMEOUT_SECS`: Optional timeout for the fallback lookup
/// - `MEDINFO_OCR_CMD`: OCR engine command (default: "tesseract")
/// - `MEDINFO_SPEECH_CMD`, `MEDINFO_CAMERA_CMD`: Optional capture commands
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any configuration value is invalid,
/// - the store cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medinfo=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MEDINFO_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let data_dir = std::env::var("MEDINFO_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let cfg = CoreConfig::new(
        PathBuf::from(data_dir),
        summary_endpoint_from_env_value(std::env::var("MEDINFO_SUMMARY_ENDPOINT").ok())?,
        fallback_timeout_from_env_value(std::env::var("MEDINFO_FALLBACK_TIMEOUT_SECS").ok())?,
        ocr_command_from_env_value(std::env::var("MEDINFO_OCR_CMD").ok()),
        std::env::var("MEDINFO_SPEECH_CMD").ok(),
        std::env::var("MEDINFO_CAMERA_CMD").ok(),
    )?;

    let services = Services::from_config(&cfg)?;
    tracing::info!("++ Storage at {}", cfg.storage_path().display());
    tracing::info!("++ Summary fallback via {}", cfg.summary_endpoint());
    tracing::info!("++ Starting MedInfo REST on {}", rest_addr);

    let app = api_rest::router(AppState { services });
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
