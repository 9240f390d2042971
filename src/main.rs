//! Main entry point for the CH-ELM case consolidation service.
//!
//! Resolves configuration from the environment once, wires the case service
//! with the in-memory store and the tracing-backed notifier, and serves the
//! REST API.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use chelm_core::{CaseService, CoreConfig, InMemoryCaseRepository, TracingNotifier};
use chelm_pseudonym::InMemoryPatientDirectory;

/// Starts the case service REST API.
///
/// # Environment Variables
/// - `CHELM_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CASE_DURATION_DAYS`: Matching window in days (default: 28)
/// - `CHELM_NAMESPACE`: Deployment namespace (default: "chelm.dev.1")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chelm=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CHELM_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let case_duration_days = match std::env::var("CASE_DURATION_DAYS") {
        Ok(value) => value.parse()?,
        Err(_) => chelm_core::DEFAULT_CASE_DURATION_DAYS,
    };
    let namespace = std::env::var("CHELM_NAMESPACE").unwrap_or_else(|_| "chelm.dev.1".into());
    let cfg = Arc::new(CoreConfig::new(case_duration_days, namespace)?);

    tracing::info!("++ Starting CH-ELM case service on {}", rest_addr);
    tracing::info!(
        "++ Case matching window: ±{} days",
        cfg.case_duration_days()
    );

    let state = AppState {
        case_service: CaseService::new(
            cfg,
            Arc::new(InMemoryCaseRepository::new()),
            Arc::new(TracingNotifier),
        ),
        patient_directory: Arc::new(InMemoryPatientDirectory::new()),
    };

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
