use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("Access denied by {0}")]
    Forbidden(String),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// Map an unsuccessful HTTP status from an exchange into an error.
    pub fn from_status(exchange: &str, status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => AppError::RateLimited(exchange.to_string()),
            403 => AppError::Forbidden(exchange.to_string()),
            _ => AppError::ExternalApi(format!("{} returned {}", exchange, status)),
        }
    }

    /// Short message suitable for showing to an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Reqwest(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                "Network error. Check the internet connection."
            }
            AppError::RateLimited(_) => "Request limit exceeded. Please try again later.",
            AppError::Forbidden(_) => "Access to the data is not allowed.",
            AppError::NotFound(_) => "No data available yet.",
            AppError::BadRequest(_) => "Invalid request.",
            _ => "Failed to load data. Please try again.",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Reqwest(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::SerdeJson(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::Anyhow(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({
            "error": message,
            "message": self.user_message(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
