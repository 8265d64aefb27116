//! Provable Value Contribution scoring
//!
//! ## Pipeline
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │ economic   │   │ social     │   │ tenure     │   vectors.rs
//! │ 0..=2500   │   │ 0..=2000   │   │ 0..=1865   │
//! └─────┬──────┘   └─────┬──────┘   └─────┬──────┘
//!       └────────────────┼────────────────┘
//!                        ▼
//!              raw sum × sybil multiplier          aggregator.rs
//!                        ▼
//!              normalize → 0..=1000
//!                        ▼
//!              classify → Tier
//! ```
//!
//! Everything here is a pure function; no state, no locking.

pub mod constants;
mod aggregator;
mod vectors;

pub use aggregator::{classify_tier, compute_pvc_score, normalize, PvcScore, PvcVectors, Tier};
pub use vectors::{
    economic_score, social_score, tenure_score, EconomicInputs, FarcasterRank, RawVectors,
    SocialInputs, TenureInputs, VectorScore,
};
