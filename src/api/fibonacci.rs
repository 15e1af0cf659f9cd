//! Ad-hoc Fibonacci analysis.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::ApiResponse;
use crate::error::{AppError, Result};
use crate::types::FibonacciAnalysis;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FibonacciQuery {
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub price: Option<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_analysis))
}

/// Levels, signals and confidence for a caller-supplied range and price.
async fn get_analysis(
    State(state): State<AppState>,
    Query(query): Query<FibonacciQuery>,
) -> Result<Json<ApiResponse<FibonacciAnalysis>>> {
    let high = required("high", query.high)?;
    let low = required("low", query.low)?;
    let price = required("price", query.price)?;

    Ok(Json(ApiResponse::fresh(
        state.analyzer.analyze(high, low, price),
    )))
}

fn required(name: &str, value: Option<f64>) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(AppError::BadRequest(format!("{} must be a finite number", name))),
        None => Err(AppError::BadRequest(format!("Missing parameter: {}", name))),
    }
}
