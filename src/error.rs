//! Error types for scoring, address handling and attestation signing.

use thiserror::Error;

/// Errors raised by the oracle core and its request boundary.
///
/// The vector calculators and the aggregator never produce these; malformed
/// numeric input is clamped instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PvcError {
    /// Address string failed the 20-byte hex grammar.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A request field failed schema validation.
    #[error("Invalid request field `{field}`: {reason}")]
    InvalidRequest {
        /// Offending field path (e.g. `untrustedData.buttonIndex`).
        field: String,
        /// Human readable reason.
        reason: String,
    },

    /// Oracle signing key is not configured.
    #[error("Oracle signing key is not configured")]
    MissingSigningKey,

    /// Reading the on-chain nonce failed.
    #[error("Failed to fetch nonce from registry: {0}")]
    UpstreamNonceFetch(String),

    /// Request body exceeded the configured size limit.
    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    /// No score record exists for the address.
    #[error("No score record for {0}")]
    NotFound(String),

    /// The signer failed to produce a signature.
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl PvcError {
    /// Whether a caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PvcError::UpstreamNonceFetch(_))
    }
}

/// Result type for oracle operations.
pub type Result<T> = std::result::Result<T, PvcError>;
