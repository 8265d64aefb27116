//! Request schemas and their validators
//!
//! Every request goes through two phases before any core logic runs:
//! 1. `validate` inspects the raw payload and collects every field error
//!    (no side effects, nothing is rewritten)
//! 2. `canonicalize` turns an already-valid payload into its typed form
//!    (addresses lowercased, integers narrowed)
//!
//! Keeping the phases apart means the validators can be tested without
//! caring how addresses are normalized.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::address::{self, Address};
use crate::error::{PvcError, Result};
use crate::scoring::RawVectors;

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Collapse a non-empty error list into the core error kind.
pub fn to_pvc_error(errors: &[FieldError]) -> PvcError {
    match errors.first() {
        Some(first) => PvcError::InvalidRequest {
            field: first.field.clone(),
            reason: first.message.clone(),
        },
        None => PvcError::InvalidRequest {
            field: "body".into(),
            reason: "invalid request".into(),
        },
    }
}

/// Two-phase boundary check.
pub trait Validate: Sized {
    type Output;

    /// Structural checks. Returns every failure, empty when valid.
    fn validate(&self) -> Vec<FieldError>;

    /// Pure transform of a payload that already passed [`Validate::validate`].
    fn canonicalize(self) -> Result<Self::Output>;

    fn into_valid(self) -> std::result::Result<Self::Output, Vec<FieldError>> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        self.canonicalize().map_err(|e| vec![FieldError::new("body", e.to_string())])
    }
}

fn check_address(field: &str, value: &str, errors: &mut Vec<FieldError>) {
    if address::validate(value).is_err() {
        let message = if value.is_empty() {
            "address is required"
        } else {
            "must be 0x followed by 40 hex digits"
        };
        errors.push(FieldError::new(field, message));
    }
}

// ============================================================================
// Sign
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignRequest {
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSignRequest {
    pub address: Address,
}

impl Validate for SignRequest {
    type Output = ValidSignRequest;

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_address("address", &self.address, &mut errors);
        errors
    }

    fn canonicalize(self) -> Result<ValidSignRequest> {
        Ok(ValidSignRequest {
            address: Address::parse(&self.address)?,
        })
    }
}

// ============================================================================
// Score
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    #[serde(default)]
    pub address: String,
    pub vectors: Option<RawVectors>,
    #[serde(alias = "sybil_multiplier")]
    pub sybil_multiplier: Option<f64>,
    pub fid: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidScoreRequest {
    pub address: Address,
    pub vectors: RawVectors,
    pub sybil_multiplier: f64,
    pub fid: Option<u64>,
}

impl Validate for ScoreRequest {
    type Output = ValidScoreRequest;

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_address("address", &self.address, &mut errors);

        if self.vectors.is_none() {
            errors.push(FieldError::new("vectors", "vectors are required"));
        }
        if let Some(m) = self.sybil_multiplier {
            if !m.is_finite() || !(0.0..=1.0).contains(&m) {
                errors.push(FieldError::new(
                    "sybilMultiplier",
                    "must be a number between 0 and 1",
                ));
            }
        }
        if let Some(fid) = self.fid {
            if fid <= 0 {
                errors.push(FieldError::new("fid", "must be a positive integer"));
            }
        }
        errors
    }

    fn canonicalize(self) -> Result<ValidScoreRequest> {
        Ok(ValidScoreRequest {
            address: Address::parse(&self.address)?,
            vectors: self.vectors.unwrap_or_default(),
            sybil_multiplier: self.sybil_multiplier.unwrap_or(1.0),
            fid: self.fid.map(|fid| fid as u64),
        })
    }
}

// ============================================================================
// Farcaster frame action
// ============================================================================

/// Frame action payload. Every field is optional; the ones present are
/// range-checked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    pub untrusted_data: Option<UntrustedData>,
    pub trusted_data: Option<TrustedData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UntrustedData {
    pub fid: Option<i64>,
    pub url: Option<String>,
    pub message_hash: Option<String>,
    pub timestamp: Option<i64>,
    pub network: Option<i64>,
    pub button_index: Option<i64>,
    pub cast_id: Option<CastId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CastId {
    pub fid: Option<i64>,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustedData {
    pub message_bytes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidFrameRequest {
    pub fid: Option<u64>,
    pub button_index: Option<u8>,
    pub message_hash: Option<String>,
    pub timestamp: Option<u64>,
    pub url: Option<Url>,
    pub network: Option<i64>,
    pub cast: Option<(u64, String)>,
    pub message_bytes: Option<String>,
}

fn check_positive(field: &str, value: Option<i64>, errors: &mut Vec<FieldError>) {
    if matches!(value, Some(v) if v <= 0) {
        errors.push(FieldError::new(field, "must be a positive integer"));
    }
}

impl Validate for FrameRequest {
    type Output = ValidFrameRequest;

    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if let Some(data) = &self.untrusted_data {
            check_positive("untrustedData.fid", data.fid, &mut errors);
            if matches!(data.button_index, Some(i) if !(1..=4).contains(&i)) {
                errors.push(FieldError::new(
                    "untrustedData.buttonIndex",
                    "must be between 1 and 4",
                ));
            }
            check_positive("untrustedData.timestamp", data.timestamp, &mut errors);
            if let Some(url) = &data.url {
                if Url::parse(url).is_err() {
                    errors.push(FieldError::new("untrustedData.url", "must be a valid URL"));
                }
            }
            if let Some(cast) = &data.cast_id {
                match cast.fid {
                    None => errors.push(FieldError::new(
                        "untrustedData.castId.fid",
                        "fid is required",
                    )),
                    fid => check_positive("untrustedData.castId.fid", fid, &mut errors),
                }
                if cast.hash.is_none() {
                    errors.push(FieldError::new("untrustedData.castId.hash", "hash is required"));
                }
            }
        }

        if let Some(trusted) = &self.trusted_data {
            if trusted.message_bytes.is_none() {
                errors.push(FieldError::new(
                    "trustedData.messageBytes",
                    "messageBytes is required",
                ));
            }
        }

        errors
    }

    fn canonicalize(self) -> Result<ValidFrameRequest> {
        let message_bytes = self.trusted_data.and_then(|t| t.message_bytes);
        let Some(data) = self.untrusted_data else {
            return Ok(ValidFrameRequest {
                message_bytes,
                ..Default::default()
            });
        };

        let url = data
            .url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| PvcError::InvalidRequest {
                field: "untrustedData.url".into(),
                reason: e.to_string(),
            })?;

        Ok(ValidFrameRequest {
            fid: data.fid.map(|fid| fid as u64),
            button_index: data.button_index.map(|i| i as u8),
            message_hash: data.message_hash.map(|h| h.trim().to_string()),
            timestamp: data.timestamp.map(|t| t as u64),
            url,
            network: data.network,
            cast: data.cast_id.and_then(|c| match (c.fid, c.hash) {
                (Some(fid), Some(hash)) => Some((fid as u64, hash.trim().to_string())),
                _ => None,
            }),
            message_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDR: &str = "0xD8DA6BF26964AF9D7EED9E03E53415D37AA96045";

    fn frame(value: serde_json::Value) -> FrameRequest {
        serde_json::from_value(value).unwrap()
    }

    fn valid_frame_json() -> serde_json::Value {
        json!({
            "untrustedData": {
                "fid": 12345,
                "url": "https://example.com/frame",
                "messageHash": "0xabc",
                "timestamp": 1700000000,
                "network": 1,
                "buttonIndex": 1,
                "castId": { "fid": 12345, "hash": "0xdef" }
            },
            "trustedData": { "messageBytes": "0x1234" }
        })
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_sign_request_normalizes() {
        let valid = SignRequest { address: ADDR.into() }.into_valid().unwrap();
        assert_eq!(valid.address.as_str(), ADDR.to_lowercase());
    }

    #[test]
    fn test_sign_request_rejects_bad_address() {
        for bad in ["", "0x123", "invalid", "0xGGGG6BF26964AF9D7EED9E03E53415D37AA96045"] {
            let errors = SignRequest { address: bad.into() }.into_valid().unwrap_err();
            assert_eq!(fields(&errors), vec!["address"], "input {bad:?}");
        }
    }

    #[test]
    fn test_validate_does_not_canonicalize() {
        let request = SignRequest { address: ADDR.into() };
        assert!(request.validate().is_empty());
        assert_eq!(request.address, ADDR);
    }

    #[test]
    fn test_score_request_defaults() {
        let request: ScoreRequest = serde_json::from_value(json!({
            "address": ADDR,
            "vectors": {
                "economic": { "gasBurnedUSD": 1000.0, "liquidityUSD": 5000.0 },
                "social": { "farcasterRank": "TOP_5", "zoraCollections": 10 },
                "tenure": { "activeMonths": 12, "currentStreak": 6 }
            }
        }))
        .unwrap();

        let valid = request.into_valid().unwrap();
        assert_eq!(valid.sybil_multiplier, 1.0);
        assert_eq!(valid.fid, None);
        assert_eq!(valid.vectors.tenure.active_months, 12);
    }

    #[test]
    fn test_score_request_collects_all_errors() {
        let request = ScoreRequest {
            address: "nope".into(),
            vectors: None,
            sybil_multiplier: Some(1.5),
            fid: Some(0),
        };
        let errors = request.into_valid().unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["address", "vectors", "sybilMultiplier", "fid"]
        );
    }

    #[test]
    fn test_score_request_multiplier_bounds() {
        for (m, ok) in [(0.0, true), (1.0, true), (0.5, true), (-0.1, false), (f64::NAN, false)] {
            let request = ScoreRequest {
                address: ADDR.into(),
                vectors: Some(RawVectors::default()),
                sybil_multiplier: Some(m),
                fid: None,
            };
            assert_eq!(request.validate().is_empty(), ok, "multiplier {m}");
        }
    }

    #[test]
    fn test_frame_request_valid() {
        let valid = frame(valid_frame_json()).into_valid().unwrap();
        assert_eq!(valid.fid, Some(12345));
        assert_eq!(valid.button_index, Some(1));
        assert_eq!(valid.timestamp, Some(1700000000));
        assert_eq!(valid.cast, Some((12345, "0xdef".to_string())));
        assert_eq!(valid.url.unwrap().host_str(), Some("example.com"));
        assert_eq!(valid.message_bytes.as_deref(), Some("0x1234"));
    }

    #[test]
    fn test_frame_request_minimal_payload() {
        let valid = frame(json!({ "untrustedData": { "fid": 42, "buttonIndex": 1 } }))
            .into_valid()
            .unwrap();
        assert_eq!(valid.fid, Some(42));
        assert_eq!(valid.button_index, Some(1));
        assert!(valid.message_hash.is_none());
        assert!(valid.timestamp.is_none());
        assert!(valid.url.is_none());
        assert!(valid.cast.is_none());
        assert!(valid.message_bytes.is_none());
    }

    #[test]
    fn test_frame_request_empty_sections_accepted() {
        assert_eq!(frame(json!({})).into_valid().unwrap(), ValidFrameRequest::default());

        let valid = frame(json!({ "untrustedData": {} })).into_valid().unwrap();
        assert!(valid.fid.is_none());
    }

    #[test]
    fn test_frame_request_button_index_range() {
        for index in [0, 5, -1] {
            let mut value = valid_frame_json();
            value["untrustedData"]["buttonIndex"] = json!(index);
            let errors = frame(value).into_valid().unwrap_err();
            assert_eq!(fields(&errors), vec!["untrustedData.buttonIndex"]);
        }
    }

    #[test]
    fn test_frame_request_present_fields_checked() {
        let errors = frame(json!({
            "untrustedData": { "fid": 0, "timestamp": -5 },
            "trustedData": {}
        }))
        .into_valid()
        .unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "untrustedData.fid",
                "untrustedData.timestamp",
                "trustedData.messageBytes",
            ]
        );
    }

    #[test]
    fn test_frame_request_bad_url_and_cast() {
        let mut value = valid_frame_json();
        value["untrustedData"]["url"] = json!("not a url");
        value["untrustedData"]["castId"] = json!({ "fid": 0 });
        let errors = frame(value).into_valid().unwrap_err();
        assert_eq!(
            fields(&errors),
            vec![
                "untrustedData.url",
                "untrustedData.castId.fid",
                "untrustedData.castId.hash",
            ]
        );
    }

    #[test]
    fn test_first_error_becomes_pvc_error() {
        let errors = vec![
            FieldError::new("address", "bad"),
            FieldError::new("fid", "worse"),
        ];
        assert_eq!(
            to_pvc_error(&errors),
            PvcError::InvalidRequest {
                field: "address".into(),
                reason: "bad".into()
            }
        );
    }
}
