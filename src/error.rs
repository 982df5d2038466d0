//! Application error type and its HTTP rendering.
//!
//! `AppError` is the single error type threaded through the crate via the
//! `Result<T>` alias. Its `IntoResponse` renders `{error, details}` where the
//! `error` field carries the reconciliation taxonomy and the status code
//! follows the spec's HTTP surface (configuration_missing 400, empty_cart 400,
//! store_not_found 404, not_found 404, invalid_transition 409,
//! provider_rejected 502, network_failure 502, bad_request 400, internal 500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::models::OrderStatus;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// The single error type surfaced across the crate.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or otherwise rejected request payload.
    #[error("{0}")]
    BadRequest(String),

    /// A cart with no resolvable items.
    #[error("Cart is empty")]
    EmptyCart,

    /// The referenced store does not exist.
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    /// A generic entity lookup miss (order, etc.).
    #[error("{0}")]
    NotFound(String),

    /// The requested provider is not configured on this store.
    #[error("{0} non configuré sur cette boutique")]
    ProviderNotConfigured(String),

    /// A payment provider rejected the request.
    #[error("{0}")]
    Provider(String),

    /// An out-of-order ledger status transition.
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A network failure talking to an external provider.
    #[error("network failure: {0}")]
    Network(String),

    /// A storage-layer failure (pool/connection/query).
    #[error("database error: {0}")]
    Database(String),

    /// An internal invariant or infrastructure failure.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// The taxonomy slug rendered in the `error` field.
    fn slug(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "bad_request",
            AppError::EmptyCart => "empty_cart",
            AppError::StoreNotFound(_) => "store_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::ProviderNotConfigured(_) => "configuration_missing",
            AppError::Provider(_) => "provider_rejected",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::Network(_) => "network_failure",
            AppError::Database(_) => "internal",
            AppError::Internal(_) => "internal",
        }
    }

    /// The HTTP status mapped from the taxonomy.
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::EmptyCart => StatusCode::BAD_REQUEST,
            AppError::ProviderNotConfigured(_) => StatusCode::BAD_REQUEST,
            AppError::StoreNotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.slug(),
            "details": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}
