//! PVC Reputation Oracle
//!
//! Computes a Provable Value Contribution score for an on-chain address from
//! economic, social and tenure activity, and signs EIP-712 attestations that
//! the on-chain reputation registry verifies before recording the score.
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── lib.rs         - Crate root with re-exports
//! ├── main.rs        - Server entrypoint
//! ├── config.rs      - Configuration management
//! ├── error.rs       - Core error kinds
//! ├── address.rs     - Address validation & canonical form
//! ├── scoring/       - PVC scoring
//! │   ├── constants.rs  - Weights, caps, tier thresholds
//! │   ├── vectors.rs    - Economic / social / tenure calculators
//! │   └── aggregator.rs - Sybil multiplier, normalization, tiers
//! ├── crypto/        - Cryptographic utilities
//! │   └── signing.rs - EIP-712 attestation signing
//! ├── chain.rs       - Registry contract reads (nonces, oracle)
//! ├── store.rs       - In-memory score records
//! └── api/           - HTTP API endpoints
//!     ├── oracle.rs     - Score, sign and frame endpoints
//!     ├── validation.rs - Request schemas & validators
//!     ├── error.rs      - Error to HTTP status mapping
//!     └── middleware.rs - Rate limiting, body limits, headers, logging
//! ```

pub mod address;
pub mod api;
pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod scoring;
pub mod store;

// Re-export main types for convenience
pub use address::Address;
pub use config::OracleConfig;
pub use error::{PvcError, Result};

// Re-export scoring types
pub use scoring::{
    EconomicInputs, FarcasterRank, PvcScore, PvcVectors, RawVectors, SocialInputs, TenureInputs,
    Tier, VectorScore, classify_tier, compute_pvc_score, economic_score, normalize, social_score,
    tenure_score,
};

// Re-export signing types
pub use crypto::{Attestation, AttestationSigner, DomainConfig};

// Re-export chain and storage types
pub use chain::{NonceSource, RegistryClient};
pub use store::{ScoreRecord, ScoreStore};

// Re-export API types
pub use api::{AppState, SecurityMiddlewareConfig, SecurityState, create_router, secured_router};
