pub mod fibonacci;
pub mod health;
pub mod scan;
pub mod tracking;

use crate::error::AppError;
use crate::types::Exchange;
use crate::AppState;
use axum::Router;
use serde::Serialize;

/// API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// True when the data was served from a stored scan.
    pub cached: bool,
}

impl<T> ApiResponse<T> {
    pub fn fresh(data: T) -> Self {
        Self {
            data,
            meta: ApiMeta { cached: false },
        }
    }

    pub fn cached(data: T) -> Self {
        Self {
            data,
            meta: ApiMeta { cached: true },
        }
    }
}

/// Parse an `:exchange` path segment.
pub(crate) fn parse_exchange(raw: &str) -> Result<Exchange, AppError> {
    Exchange::from_str(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown exchange: {}", raw)))
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/scan", scan::router())
        .nest("/api/fibonacci", fibonacci::router())
        .nest("/api/tracking", tracking::router())
}
