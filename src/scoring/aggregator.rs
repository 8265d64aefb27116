//! Score Aggregator
//!
//! Sums the three vector sub-scores, applies the sybil multiplier, normalizes
//! onto `[0, 1000]` and classifies the result into a [`Tier`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::constants::{
    NORMALIZED_MAX, TIER_BASED_MIN, TIER_BUILDER_MIN, TIER_LEGEND_MIN, TIER_RESIDENT_MIN,
    TOTAL_RAW_MAX,
};
use super::vectors::{
    economic_score, social_score, tenure_score, EconomicInputs, RawVectors, SocialInputs,
    TenureInputs, VectorScore,
};
use crate::address::Address;
use crate::error::PvcError;

/// Reputation band. The discriminant is the contract-facing `uint8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Tourist = 0,
    Resident = 1,
    Builder = 2,
    Based = 3,
    Legend = 4,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Tourist,
        Tier::Resident,
        Tier::Builder,
        Tier::Based,
        Tier::Legend,
    ];

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tourist => "TOURIST",
            Tier::Resident => "RESIDENT",
            Tier::Builder => "BUILDER",
            Tier::Based => "BASED",
            Tier::Legend => "LEGEND",
        }
    }

    /// Lowest normalized score belonging to this tier.
    pub fn min_score(&self) -> u32 {
        match self {
            Tier::Tourist => 0,
            Tier::Resident => TIER_RESIDENT_MIN,
            Tier::Builder => TIER_BUILDER_MIN,
            Tier::Based => TIER_BASED_MIN,
            Tier::Legend => TIER_LEGEND_MIN,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = PvcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Tier::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| PvcError::InvalidRequest {
                field: "tier".to_string(),
                reason: format!("tier must be between 0 and 4, got {value}"),
            })
    }
}

impl FromStr for Tier {
    type Err = PvcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tier::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PvcError::InvalidRequest {
                field: "tier".to_string(),
                reason: format!("unknown tier: {s}"),
            })
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-vector breakdown kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvcVectors {
    pub economic: VectorScore<EconomicInputs>,
    pub social: VectorScore<SocialInputs>,
    pub tenure: VectorScore<TenureInputs>,
}

/// Aggregate scoring result. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvcScore {
    pub address: Address,
    /// Normalized score in `[0, 1000]`; the raw sum is never stored.
    pub total_score: u32,
    pub tier: Tier,
    pub vectors: PvcVectors,
    pub sybil_multiplier: f64,
}

/// Map a raw (post-multiplier) total onto `[0, 1000]`.
pub fn normalize(raw_score: i64) -> u32 {
    if raw_score <= 0 {
        return 0;
    }
    if raw_score >= TOTAL_RAW_MAX as i64 {
        return NORMALIZED_MAX;
    }

    ((raw_score as f64 / TOTAL_RAW_MAX as f64) * NORMALIZED_MAX as f64).round() as u32
}

/// Highest tier whose inclusive minimum is at or below `normalized_score`.
pub fn classify_tier(normalized_score: u32) -> Tier {
    if normalized_score >= TIER_LEGEND_MIN {
        Tier::Legend
    } else if normalized_score >= TIER_BASED_MIN {
        Tier::Based
    } else if normalized_score >= TIER_BUILDER_MIN {
        Tier::Builder
    } else if normalized_score >= TIER_RESIDENT_MIN {
        Tier::Resident
    } else {
        Tier::Tourist
    }
}

/// Apply the sybil multiplier to a raw total, rounding to the nearest integer.
/// Non-finite multipliers count as zero.
fn apply_multiplier(raw_total: u32, sybil_multiplier: f64) -> i64 {
    if !sybil_multiplier.is_finite() {
        return 0;
    }
    (raw_total as f64 * sybil_multiplier).round() as i64
}

/// Score an address from its raw vectors.
///
/// The multiplier is applied to the raw sum before normalization.
pub fn compute_pvc_score(address: Address, vectors: &RawVectors, sybil_multiplier: f64) -> PvcScore {
    let economic = economic_score(
        vectors.economic.gas_burned_usd,
        vectors.economic.liquidity_usd,
    );
    let social = social_score(
        vectors.social.farcaster_rank,
        vectors.social.zora_collections,
    );
    let tenure = tenure_score(
        vectors.tenure.active_months,
        vectors.tenure.current_streak,
    );

    let raw_total = economic + social + tenure;
    let adjusted_total = apply_multiplier(raw_total, sybil_multiplier);
    let total_score = normalize(adjusted_total);

    PvcScore {
        address,
        total_score,
        tier: classify_tier(total_score),
        vectors: PvcVectors {
            economic: VectorScore {
                score: economic,
                details: vectors.economic,
            },
            social: VectorScore {
                score: social,
                details: vectors.social,
            },
            tenure: VectorScore {
                score: tenure,
                details: vectors.tenure,
            },
        },
        sybil_multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::constants::{MAX_ECONOMIC, MAX_SOCIAL, MAX_TENURE};
    use crate::scoring::vectors::FarcasterRank;

    fn addr() -> Address {
        Address::parse("0xd8da6bf26964af9d7eed9e03e53415d37aa96045").unwrap()
    }

    fn sample_vectors() -> RawVectors {
        RawVectors {
            economic: EconomicInputs {
                gas_burned_usd: 1000.0,
                liquidity_usd: 5000.0,
            },
            social: SocialInputs {
                farcaster_rank: FarcasterRank::Top5,
                zora_collections: 10,
            },
            tenure: TenureInputs {
                active_months: 12,
                current_streak: 6,
            },
        }
    }

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(0), 0);
        assert_eq!(normalize(-10), 0);
        assert_eq!(normalize(TOTAL_RAW_MAX as i64), 1000);
        assert_eq!(normalize(TOTAL_RAW_MAX as i64 / 2), 500);
        assert_eq!(normalize(TOTAL_RAW_MAX as i64 * 3), 1000);
        // 3182.5 sits between these two; both land on 500.
        assert_eq!(normalize(3183), 500);
    }

    #[test]
    fn test_classify_tier_boundaries() {
        assert_eq!(classify_tier(0), Tier::Tourist);
        assert_eq!(classify_tier(350), Tier::Tourist);
        assert_eq!(classify_tier(351), Tier::Resident);
        assert_eq!(classify_tier(650), Tier::Resident);
        assert_eq!(classify_tier(651), Tier::Builder);
        assert_eq!(classify_tier(850), Tier::Builder);
        assert_eq!(classify_tier(851), Tier::Based);
        assert_eq!(classify_tier(950), Tier::Based);
        assert_eq!(classify_tier(951), Tier::Legend);
        assert_eq!(classify_tier(1000), Tier::Legend);
    }

    #[test]
    fn test_classify_tier_is_monotonic_partition() {
        let mut previous = Tier::Tourist;
        for score in 0..=1000u32 {
            let tier = classify_tier(score);
            assert!(tier >= previous, "tier decreased at {score}");
            assert!(score >= tier.min_score());
            previous = tier;
        }
        assert_eq!(previous, Tier::Legend);
    }

    #[test]
    fn test_tier_wire_mapping() {
        for (i, tier) in Tier::ALL.iter().enumerate() {
            assert_eq!(tier.as_u8() as usize, i);
            assert_eq!(Tier::try_from(i as u8).unwrap(), *tier);
            assert_eq!(tier.as_str().parse::<Tier>().unwrap(), *tier);
        }
        assert!(Tier::try_from(5).is_err());
        assert!("MAYOR".parse::<Tier>().is_err());
        assert_eq!(serde_json::to_string(&Tier::Based).unwrap(), "\"BASED\"");
    }

    #[test]
    fn test_compute_end_to_end() {
        let score = compute_pvc_score(addr(), &sample_vectors(), 1.0);

        // economic: 800*log10(1001) + 50*5 = 2400.3 + 250 -> capped 2500
        assert_eq!(score.vectors.economic.score, 2500);
        assert_eq!(score.vectors.social.score, 950);
        assert_eq!(score.vectors.tenure.score, 1500);
        assert!(score.vectors.economic.score <= MAX_ECONOMIC);
        assert!(score.vectors.social.score <= MAX_SOCIAL);
        assert!(score.vectors.tenure.score <= MAX_TENURE);

        // round(4950 / 6365 * 1000) = 778
        assert_eq!(score.total_score, 778);
        assert_eq!(score.tier, Tier::Builder);
        assert_eq!(score.sybil_multiplier, 1.0);
        assert_eq!(score.address, addr());
    }

    #[test]
    fn test_sybil_multiplier_down_weights() {
        let full = compute_pvc_score(addr(), &sample_vectors(), 1.0);
        let half = compute_pvc_score(addr(), &sample_vectors(), 0.5);
        assert!(half.total_score <= full.total_score);
        // round(4950 * 0.5) = 2475 -> round(388.85) = 389
        assert_eq!(half.total_score, 389);
        assert_eq!(half.tier, Tier::Resident);
        // Sub-scores are unaffected by the multiplier.
        assert_eq!(half.vectors, full.vectors);
    }

    #[test]
    fn test_degenerate_multipliers() {
        let zero = compute_pvc_score(addr(), &sample_vectors(), 0.0);
        assert_eq!(zero.total_score, 0);
        assert_eq!(zero.tier, Tier::Tourist);

        let negative = compute_pvc_score(addr(), &sample_vectors(), -2.0);
        assert_eq!(negative.total_score, 0);

        let nan = compute_pvc_score(addr(), &sample_vectors(), f64::NAN);
        assert_eq!(nan.total_score, 0);

        let boosted = compute_pvc_score(addr(), &sample_vectors(), 10.0);
        assert_eq!(boosted.total_score, 1000);
        assert_eq!(boosted.tier, Tier::Legend);
    }

    #[test]
    fn test_empty_vectors_score_zero() {
        let score = compute_pvc_score(addr(), &RawVectors::default(), 1.0);
        assert_eq!(score.total_score, 0);
        assert_eq!(score.tier, Tier::Tourist);
    }

    #[test]
    fn test_pvc_score_json_shape() {
        let score = compute_pvc_score(addr(), &sample_vectors(), 1.0);
        let json = serde_json::to_value(&score).unwrap();
        assert_eq!(json["totalScore"], 778);
        assert_eq!(json["tier"], "BUILDER");
        assert_eq!(json["sybilMultiplier"], 1.0);
        assert_eq!(json["vectors"]["social"]["details"]["farcasterRank"], "TOP_5");
        assert_eq!(json["vectors"]["economic"]["details"]["gasBurnedUSD"], 1000.0);
    }
}
