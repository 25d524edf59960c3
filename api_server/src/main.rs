use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use config_manager::SystemConfig;
use job_orchestrator::{OrchestratorError, ReportOrchestrator};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

mod handlers;
mod types;

use handlers::*;
use types::*;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ReportOrchestrator>,
    pub started_at: Instant,
}

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Orchestrator(#[from] OrchestratorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Orchestrator(OrchestratorError::InvalidWallet(_)) => StatusCode::BAD_REQUEST,
            ApiError::Orchestrator(OrchestratorError::TransactionFetch(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Orchestrator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            timestamp: chrono::Utc::now(),
        });

        (status, body).into_response()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = SystemConfig::load()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(&config).into()),
        )
        .init();

    info!("Starting wallet analysis API server...");

    let orchestrator = Arc::new(ReportOrchestrator::from_config(&config)?);
    info!("Report orchestrator initialized");

    let app_state = AppState {
        orchestrator,
        started_at: Instant::now(),
    };

    let app = create_router(app_state);

    info!("Available endpoints:");
    info!("   • GET /health - Health check");
    info!("   • GET /api/wallets/:address/analysis - Swap history analysis");
    info!("   • GET /api/wallets/:address/analysis/export.csv - Analysis as CSV");

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Log filter used when `RUST_LOG` is unset
fn default_log_filter(config: &SystemConfig) -> &'static str {
    if config.system.debug_mode {
        "debug"
    } else {
        "info,api_server=debug,job_orchestrator=debug"
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/wallets/:address/analysis", get(analyze_wallet))
        .route(
            "/api/wallets/:address/analysis/export.csv",
            get(export_wallet_analysis_csv),
        )
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}
