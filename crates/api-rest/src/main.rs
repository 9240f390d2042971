//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the case-service REST API on its own, backed by the in-memory store.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server
//! (with OpenAPI/Swagger UI). Deployments use the workspace's main
//! `chelm-run` binary.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use chelm_core::{CaseService, CoreConfig, InMemoryCaseRepository, TracingNotifier};
use chelm_pseudonym::InMemoryPatientDirectory;

/// Main entry point for the standalone REST API server.
///
/// # Environment Variables
/// - `CHELM_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `CASE_DURATION_DAYS`: Matching window in days (default: 28)
/// - `CHELM_NAMESPACE`: Deployment namespace (default: "chelm.dev.1")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration values are invalid, or
/// - the server address cannot be bound.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CHELM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let case_duration_days = match std::env::var("CASE_DURATION_DAYS") {
        Ok(value) => value.parse()?,
        Err(_) => chelm_core::DEFAULT_CASE_DURATION_DAYS,
    };
    let namespace = std::env::var("CHELM_NAMESPACE").unwrap_or_else(|_| "chelm.dev.1".into());
    let cfg = Arc::new(CoreConfig::new(case_duration_days, namespace)?);

    tracing::info!("-- Starting CH-ELM case REST API on {}", addr);

    let state = AppState {
        case_service: CaseService::new(
            cfg,
            Arc::new(InMemoryCaseRepository::new()),
            Arc::new(TracingNotifier),
        ),
        patient_directory: Arc::new(InMemoryPatientDirectory::new()),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
