//! HTTP error mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use eventos_billing::{BillingError, EntitlementDecision};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    /// Denied entitlement, carrying the full decision for the UI
    #[error("{}", .0.reason.as_deref().unwrap_or("não permitido"))]
    Denied(EntitlementDecision),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::UserNotFound(_)
            | BillingError::PaymentNotFound(_)
            | BillingError::SessionNotFound(_) => ApiError::NotFound(err.to_string()),
            BillingError::InvalidPlan(_)
            | BillingError::InvalidAmount(_)
            | BillingError::WebhookSignatureInvalid
            | BillingError::WebhookPayloadInvalid(_)
            | BillingError::WebhookUserUnresolvable => ApiError::BadRequest(err.to_string()),
            BillingError::LimitExceeded(_) => ApiError::Forbidden(err.to_string()),
            BillingError::Provider(_) | BillingError::Store(_) => {
                ApiError::Internal(anyhow::Error::new(err))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // Denied entitlements return the full decision so the UI
            // can surface the reason and the remediation action.
            ApiError::Denied(decision) => {
                return (StatusCode::FORBIDDEN, Json(decision)).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "authentication required".to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Internal(source) => {
                tracing::error!(error = %source, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
