//! HTTP API for the PVC Oracle
//!
//! Provides:
//! - Oracle API (scoring, attestation signing, Farcaster frame actions)
//! - Boundary validation with structured 400 responses
//! - Security middleware (rate limiting, body limits, headers, request logs)

pub mod error;
pub mod middleware;
pub mod oracle;
pub mod validation;

pub use error::ApiError;
pub use middleware::{
    RateDecision, RateLimiter, SecurityMiddlewareConfig, SecurityState, body_size_middleware,
    logging_middleware, rate_limit_middleware, security_headers_middleware,
};
pub use oracle::{AppState, FrameResponse, SignResponse, create_router};
pub use validation::{
    FieldError, FrameRequest, ScoreRequest, SignRequest, Validate, ValidFrameRequest,
    ValidScoreRequest, ValidSignRequest,
};

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};

/// Oracle router with the security layers applied, outermost first:
/// rate limit, body size, request log, security headers.
///
/// `body_size_middleware` rejects oversized declared lengths up front;
/// `DefaultBodyLimit` caps what the JSON extractors will buffer, which covers
/// chunked bodies and requests without a content-length.
pub fn secured_router(state: AppState, security: SecurityState) -> Router {
    create_router(state)
        .layer(DefaultBodyLimit::max(security.config.max_request_size))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn_with_state(
            security.clone(),
            logging_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security.clone(),
            body_size_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            security,
            rate_limit_middleware,
        ))
}
