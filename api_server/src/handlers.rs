use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json},
};
use job_orchestrator::report_to_csv;
use tracing::info;

use crate::types::{HealthResponse, SuccessResponse};
use crate::{ApiError, AppState};

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(SuccessResponse::new(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    }))
}

/// Run a full swap-history analysis for one wallet
pub async fn analyze_wallet(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Analysis requested for wallet {}", wallet_address);
    let report = state.orchestrator.run(&wallet_address).await?;

    Ok(Json(SuccessResponse::new(report)))
}

/// Run an analysis and return the per-token reports as CSV
pub async fn export_wallet_analysis_csv(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    info!("CSV export requested for wallet {}", wallet_address);
    let report = state.orchestrator.run(&wallet_address).await?;
    let csv_content = report_to_csv(&report)?;

    let disposition = format!(
        "attachment; filename=\"wallet_analysis_{}.csv\"",
        wallet_address
    );
    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, csv_content))
}
