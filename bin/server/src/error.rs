//! HTTP error mapping.
//!
//! Broker errors become a status code and a generic message. The full report
//! is logged; nothing from it reaches the response body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gatehouse_session::BrokerError;
use rootcause::prelude::Report;
use serde_json::json;
use std::fmt;

/// A failed API request.
#[derive(Debug)]
pub struct ApiError(BrokerError);

impl ApiError {
    /// A malformed request.
    #[must_use]
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self(BrokerError::BadRequest {
            reason: reason.into(),
        })
    }

    /// A request without acceptable credentials.
    #[must_use]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self(BrokerError::access_denied(reason))
    }

    /// The underlying broker error.
    #[must_use]
    pub fn kind(&self) -> &BrokerError {
        &self.0
    }

    /// Status code for the error kind.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            BrokerError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            BrokerError::AccessDenied { .. } => StatusCode::UNAUTHORIZED,
            BrokerError::NotFound { .. } => StatusCode::NOT_FOUND,
            BrokerError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BrokerError::UnsupportedProvider { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            BrokerError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BrokerError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            BrokerError::BadRequest { .. } => "Bad request",
            BrokerError::AccessDenied { .. } => "Access denied",
            BrokerError::NotFound { .. } => "Not found",
            BrokerError::Validation { .. } => "Invalid provider configuration",
            BrokerError::UnsupportedProvider { .. } => "Unsupported provider",
            BrokerError::Store { .. } => "Service unavailable",
            BrokerError::Timeout { .. } => "Upstream timeout",
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Report<BrokerError>> for ApiError {
    fn from(report: Report<BrokerError>) -> Self {
        let err = Self(report.current_context().clone());
        if err.status().is_server_error() {
            tracing::error!(error = %report, "request failed");
        } else {
            tracing::debug!(error = %report, "request rejected");
        }
        err
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
