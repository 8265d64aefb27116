//! Scoring weights, per-vector caps and tier thresholds.

/// Cap for the economic vector.
pub const MAX_ECONOMIC: u32 = 2500;
/// Cap for the social vector.
pub const MAX_SOCIAL: u32 = 2000;
/// Cap for the tenure vector.
pub const MAX_TENURE: u32 = 1865;
/// Sum of the three vector caps.
pub const TOTAL_RAW_MAX: u32 = MAX_ECONOMIC + MAX_SOCIAL + MAX_TENURE;

/// Upper end of the normalized scale.
pub const NORMALIZED_MAX: u32 = 1000;

/// Coefficient on `log10(gas_burned_usd + 1)`.
pub const ECONOMIC_ALPHA: f64 = 800.0;
/// Coefficient on `liquidity_usd / 1000`.
pub const ECONOMIC_BETA: f64 = 50.0;
/// Liquidity divisor (USD per unit of BETA).
pub const LIQUIDITY_UNIT_USD: f64 = 1000.0;

/// OpenRank bucket contributions.
pub const OPENRANK_TOP_1: u32 = 1200;
pub const OPENRANK_TOP_5: u32 = 800;
pub const OPENRANK_TOP_20: u32 = 400;
pub const OPENRANK_UNRANKED: u32 = 0;

/// Points per Zora collection minted.
pub const ZORA_MULTIPLIER: u32 = 15;

/// Points per active month.
pub const TENURE_MONTH_WEIGHT: u32 = 100;
/// Points per month of current streak.
pub const TENURE_STREAK_BONUS: u32 = 50;

// Tier minimums on the normalized scale, inclusive. TOURIST starts at 0.
pub const TIER_RESIDENT_MIN: u32 = 351;
pub const TIER_BUILDER_MIN: u32 = 651;
pub const TIER_BASED_MIN: u32 = 851;
pub const TIER_LEGEND_MIN: u32 = 951;

/// Attestation validity window in seconds.
pub const ATTESTATION_TTL_SECS: u64 = 3600;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_max_is_sum_of_caps() {
        assert_eq!(TOTAL_RAW_MAX, 6365);
    }

    #[test]
    fn test_tier_minimums_are_ordered() {
        let mins = [
            TIER_RESIDENT_MIN,
            TIER_BUILDER_MIN,
            TIER_BASED_MIN,
            TIER_LEGEND_MIN,
        ];
        assert!(mins.windows(2).all(|w| w[0] < w[1]));
        assert!(TIER_LEGEND_MIN <= NORMALIZED_MAX);
    }
}
