//! Scan result endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{parse_exchange, ApiResponse};
use crate::error::{AppError, Result};
use crate::types::{Exchange, ScanResult, ScanStats, SignalFilter};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    /// all, resistance or support
    pub filter: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:exchange", get(get_scan))
        .route("/:exchange/refresh", post(refresh_scan))
        .route("/:exchange/stats", get(get_stats))
}

/// Latest scan for an exchange, optionally filtered by signal kind.
async fn get_scan(
    State(state): State<AppState>,
    Path(exchange): Path<String>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<ApiResponse<ScanResult>>> {
    let exchange = parse_exchange(&exchange)?;
    let filter = parse_filter(query.filter.as_deref())?;
    let result = latest(&state, exchange)?;

    Ok(Json(ApiResponse::cached(result.filtered(filter))))
}

/// Run a scan now and return it.
async fn refresh_scan(
    State(state): State<AppState>,
    Path(exchange): Path<String>,
) -> Result<Json<ApiResponse<ScanResult>>> {
    let exchange = parse_exchange(&exchange)?;
    let result = state.scanner.run_cycle(exchange).await?;
    Ok(Json(ApiResponse::fresh(result)))
}

async fn get_stats(
    State(state): State<AppState>,
    Path(exchange): Path<String>,
) -> Result<Json<ApiResponse<ScanStats>>> {
    let exchange = parse_exchange(&exchange)?;
    let result = latest(&state, exchange)?;
    Ok(Json(ApiResponse::cached(result.stats)))
}

fn latest(state: &AppState, exchange: Exchange) -> Result<ScanResult> {
    state
        .scanner
        .latest(exchange)
        .ok_or_else(|| AppError::NotFound(format!("No {} scan available yet", exchange)))
}

fn parse_filter(raw: Option<&str>) -> Result<SignalFilter> {
    match raw {
        None => Ok(SignalFilter::All),
        Some(value) => SignalFilter::from_str(value)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown filter: {}", value))),
    }
}
