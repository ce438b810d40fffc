//! Error types for the Billing API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use hamper_billing_core::{BillingError, SubscriptionConflict};

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("User not found")]
    UserNotFound,

    /// Enrollment collided with existing active subscriptions; the caller
    /// re-submits with force_merge or abandons
    #[error("Enrollment conflicts with existing subscriptions")]
    SubscriptionConflict(Vec<SubscriptionConflict>),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error")]
    Database(#[from] hamper_db::DbError),
}

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Validation(msg) => Self::BadRequest(msg),
            BillingError::UserNotFound => Self::UserNotFound,
            BillingError::SubscriptionNotFound => Self::SubscriptionNotFound,
            BillingError::InvalidTransition { .. } => Self::InvalidTransition(err.to_string()),
            BillingError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::SubscriptionNotFound | Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::SubscriptionConflict(_) | Self::InvalidTransition(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::SubscriptionConflict(_) => "SUBSCRIPTION_CONFLICT",
            Self::InvalidTransition(_) => "INVALID_TRANSITION",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) | Self::Database(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors
        if matches!(self, Self::Internal(_) | Self::Database(_)) {
            tracing::error!(error = ?self, "Internal API error");
        }

        let details = match &self {
            Self::SubscriptionConflict(conflicts) => serde_json::to_value(conflicts)
                .map(|conflicts| serde_json::json!({ "conflicts": conflicts }))
                .ok(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
