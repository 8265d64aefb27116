//! HTTP mapping for oracle errors
//!
//! | error                          | status | logged at |
//! |--------------------------------|--------|-----------|
//! | InvalidAddress, InvalidRequest | 400    | debug     |
//! | NotFound                       | 404    | debug     |
//! | PayloadTooLarge                | 413    | warn      |
//! | UpstreamNonceFetch             | 503    | warn      |
//! | anything else                  | 500    | error     |
//!
//! 500 bodies are always the generic message; detail stays in the logs.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use super::validation::{FieldError, to_pvc_error};
use crate::error::PvcError;

#[derive(Debug)]
pub struct ApiError {
    pub error: PvcError,
    pub details: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "no_details")]
    details: &'a [FieldError],
}

fn no_details(details: &&[FieldError]) -> bool {
    details.is_empty()
}

impl ApiError {
    pub fn invalid(details: Vec<FieldError>) -> Self {
        Self {
            error: to_pvc_error(&details),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.error {
            PvcError::InvalidAddress(_) | PvcError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            PvcError::NotFound(_) => StatusCode::NOT_FOUND,
            PvcError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            PvcError::UpstreamNonceFetch(_) => StatusCode::SERVICE_UNAVAILABLE,
            PvcError::MissingSigningKey | PvcError::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PvcError> for ApiError {
    fn from(error: PvcError) -> Self {
        let details = match &error {
            PvcError::InvalidAddress(_) => vec![FieldError::new(
                "address",
                "must be 0x followed by 40 hex digits",
            )],
            PvcError::InvalidRequest { field, reason } => {
                vec![FieldError::new(field.clone(), reason.clone())]
            }
            _ => Vec::new(),
        };
        Self { error, details }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Body limit hit while buffering (chunked or unannounced length)
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return PvcError::PayloadTooLarge(rejection.body_text()).into();
        }
        ApiError::invalid(vec![FieldError::new("body", rejection.body_text())])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.error {
            PvcError::InvalidAddress(_) => {
                debug!(error = %self.error, "Rejected address");
                "Invalid address"
            }
            PvcError::InvalidRequest { .. } => {
                debug!(error = %self.error, "Rejected request");
                "Invalid request"
            }
            PvcError::NotFound(_) => {
                debug!(error = %self.error, "Score not found");
                "Score not found"
            }
            PvcError::PayloadTooLarge(_) => {
                warn!(error = %self.error, "Request body too large");
                "Request body too large"
            }
            PvcError::UpstreamNonceFetch(_) => {
                warn!(error = %self.error, retryable = true, "Nonce fetch failed");
                "Nonce unavailable, retry later"
            }
            PvcError::MissingSigningKey | PvcError::Signing(_) => {
                error!(error = %self.error, "Request failed");
                "Internal Server Error"
            }
        };

        let body = ErrorBody {
            error: message,
            details: &self.details,
        };
        (status, Json(body)).into_response()
    }
}
