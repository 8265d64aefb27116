//! Vector Calculators
//!
//! Three pure functions turning raw behavioral inputs into bounded
//! sub-scores. None of them fail: negative or non-finite inputs are clamped
//! to zero and results are capped at the per-vector maximum, so noisy
//! upstream data degrades a score instead of aborting it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{
    ECONOMIC_ALPHA, ECONOMIC_BETA, LIQUIDITY_UNIT_USD, MAX_ECONOMIC, MAX_SOCIAL, MAX_TENURE,
    OPENRANK_TOP_1, OPENRANK_TOP_20, OPENRANK_TOP_5, OPENRANK_UNRANKED, TENURE_MONTH_WEIGHT,
    TENURE_STREAK_BONUS, ZORA_MULTIPLIER,
};

/// Farcaster OpenRank percentile bucket.
///
/// Deserializes from any string; unrecognized values become `Unranked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String")]
pub enum FarcasterRank {
    #[serde(rename = "TOP_1")]
    Top1,
    #[serde(rename = "TOP_5")]
    Top5,
    #[serde(rename = "TOP_20")]
    Top20,
    #[default]
    #[serde(rename = "UNRANKED")]
    Unranked,
}

impl FarcasterRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            FarcasterRank::Top1 => "TOP_1",
            FarcasterRank::Top5 => "TOP_5",
            FarcasterRank::Top20 => "TOP_20",
            FarcasterRank::Unranked => "UNRANKED",
        }
    }

    /// OpenRank table lookup.
    pub fn points(&self) -> u32 {
        match self {
            FarcasterRank::Top1 => OPENRANK_TOP_1,
            FarcasterRank::Top5 => OPENRANK_TOP_5,
            FarcasterRank::Top20 => OPENRANK_TOP_20,
            FarcasterRank::Unranked => OPENRANK_UNRANKED,
        }
    }
}

impl From<&str> for FarcasterRank {
    fn from(value: &str) -> Self {
        match value {
            "TOP_1" => FarcasterRank::Top1,
            "TOP_5" => FarcasterRank::Top5,
            "TOP_20" => FarcasterRank::Top20,
            _ => FarcasterRank::Unranked,
        }
    }
}

impl From<String> for FarcasterRank {
    fn from(value: String) -> Self {
        FarcasterRank::from(value.as_str())
    }
}

impl fmt::Display for FarcasterRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Economic inputs (USD amounts).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EconomicInputs {
    #[serde(rename = "gasBurnedUSD")]
    pub gas_burned_usd: f64,
    /// Liquidity locked for more than 7 days; the lock rule is enforced upstream.
    #[serde(rename = "liquidityUSD")]
    pub liquidity_usd: f64,
}

/// Social inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SocialInputs {
    pub farcaster_rank: FarcasterRank,
    pub zora_collections: i64,
}

/// Tenure inputs (months).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TenureInputs {
    pub active_months: i64,
    pub current_streak: i64,
}

/// Per-address raw behavioral inputs, supplied per scoring request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RawVectors {
    pub economic: EconomicInputs,
    pub social: SocialInputs,
    pub tenure: TenureInputs,
}

/// One vector's bounded sub-score plus the inputs that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorScore<D> {
    pub score: u32,
    pub details: D,
}

fn non_negative(value: f64) -> f64 {
    // f64::max ignores NaN, so NaN maps to 0 as well.
    value.max(0.0)
}

fn capped_round(total: f64, cap: u32) -> u32 {
    let rounded = total.round();
    if rounded >= cap as f64 {
        cap
    } else {
        rounded.max(0.0) as u32
    }
}

/// `round(ALPHA * log10(gas + 1) + BETA * liquidity / 1000)`, capped at `MAX_ECONOMIC`.
pub fn economic_score(gas_burned_usd: f64, liquidity_usd: f64) -> u32 {
    let gas_score = ECONOMIC_ALPHA * (non_negative(gas_burned_usd) + 1.0).log10();
    let liquidity_score = ECONOMIC_BETA * (non_negative(liquidity_usd) / LIQUIDITY_UNIT_USD);

    capped_round(gas_score + liquidity_score, MAX_ECONOMIC)
}

/// `OPENRANK[rank] + zora * ZORA_MULTIPLIER`, capped at `MAX_SOCIAL`.
pub fn social_score(farcaster_rank: FarcasterRank, zora_collections: i64) -> u32 {
    let zora_score = zora_collections
        .max(0)
        .saturating_mul(ZORA_MULTIPLIER as i64);
    let total = zora_score.saturating_add(farcaster_rank.points() as i64);

    total.min(MAX_SOCIAL as i64) as u32
}

/// `months * MONTH_WEIGHT + streak * STREAK_BONUS`, capped at `MAX_TENURE`.
pub fn tenure_score(active_months: i64, current_streak: i64) -> u32 {
    let months_score = active_months
        .max(0)
        .saturating_mul(TENURE_MONTH_WEIGHT as i64);
    let streak_score = current_streak
        .max(0)
        .saturating_mul(TENURE_STREAK_BONUS as i64);
    let total = months_score.saturating_add(streak_score);

    total.min(MAX_TENURE as i64) as u32
}
