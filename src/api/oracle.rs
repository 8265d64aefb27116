//! Oracle API endpoints for scoring and attestation
//!
//! Endpoints:
//!   GET  /health            -> Liveness check ("OK")
//!   POST /score             -> Compute and store a PVC score
//!   GET  /score/{address}   -> Latest stored score
//!   POST /sign              -> EIP-712 attestation for the stored score
//!   POST /frame             -> Farcaster frame action (score lookup by fid)

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use ethers::types::U256;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::error::ApiError;
use super::validation::{FrameRequest, ScoreRequest, SignRequest, Validate};
use crate::address::Address;
use crate::chain::NonceSource;
use crate::crypto::{Attestation, AttestationSigner};
use crate::error::PvcError;
use crate::scoring::{PvcScore, Tier, compute_pvc_score};
use crate::store::ScoreStore;

// ============================================================================
// State
// ============================================================================

/// Oracle API state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ScoreStore>,
    pub signer: Arc<AttestationSigner>,
    pub nonces: Arc<dyn NonceSource>,
    /// Upper bound on one nonce read
    pub nonce_timeout: Duration,
    /// Public base URL, used for links handed out in frame responses
    pub app_url: String,
}

impl AppState {
    pub fn new(
        store: Arc<ScoreStore>,
        signer: Arc<AttestationSigner>,
        nonces: Arc<dyn NonceSource>,
    ) -> Self {
        Self {
            store,
            signer,
            nonces,
            nonce_timeout: Duration::from_secs(10),
            app_url: "http://localhost:8787".to_string(),
        }
    }

    pub fn with_nonce_timeout(mut self, timeout: Duration) -> Self {
        self.nonce_timeout = timeout;
        self
    }

    pub fn with_app_url(mut self, app_url: impl Into<String>) -> Self {
        self.app_url = app_url.into();
        self
    }

    fn mint_url(&self) -> String {
        format!("{}/mint", self.app_url.trim_end_matches('/'))
    }

    /// Read-then-sign: the nonce is fetched immediately before signing.
    async fn fetch_nonce(&self, user: &Address) -> Result<U256, PvcError> {
        match tokio::time::timeout(self.nonce_timeout, self.nonces.nonce_of(user)).await {
            Ok(result) => result,
            Err(_) => Err(PvcError::UpstreamNonceFetch(format!(
                "nonce read timed out after {}ms",
                self.nonce_timeout.as_millis()
            ))),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Contract-facing attestation: tier as its integer code, large integers as
/// decimal strings.
#[derive(Debug, Serialize)]
pub struct SignResponse {
    pub score: u32,
    pub tier: u8,
    #[serde(flatten)]
    pub attestation: Attestation,
}

#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub fid: Option<u64>,
    pub button_index: Option<u8>,
    pub address: Option<Address>,
    pub score: u32,
    pub tier: Tier,
    /// "Mint Badge" link target
    pub mint_url: String,
}

// ============================================================================
// API Handlers
// ============================================================================

pub async fn health() -> &'static str {
    "OK"
}

/// Score an address from supplied raw vectors and store the result
pub async fn compute_score(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<PvcScore>, ApiError> {
    let Json(request) = payload?;
    let request = request.into_valid().map_err(ApiError::invalid)?;

    let score = compute_pvc_score(
        request.address,
        &request.vectors,
        request.sybil_multiplier,
    );
    state.store.upsert(score.clone(), request.fid);

    info!(
        address = %score.address,
        total_score = score.total_score,
        tier = %score.tier,
        sybil_multiplier = score.sybil_multiplier,
        "Score computed"
    );

    Ok(Json(score))
}

/// Latest stored score for an address
pub async fn get_score(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<PvcScore>, ApiError> {
    let address = Address::parse(&address)?;

    state
        .store
        .get(&address)
        .map(|record| Json(record.score))
        .ok_or_else(|| PvcError::NotFound(address.to_string()).into())
}

/// Sign the stored score for an address against its current registry nonce
pub async fn sign_score(
    State(state): State<AppState>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<SignResponse>, ApiError> {
    let Json(request) = payload?;
    let address = request.into_valid().map_err(ApiError::invalid)?.address;

    let record = state
        .store
        .get(&address)
        .ok_or_else(|| PvcError::NotFound(address.to_string()))?;
    let nonce = state.fetch_nonce(&address).await?;

    let score = record.score.total_score;
    let tier = record.score.tier;
    let attestation = state.signer.sign(&address, score, tier, nonce).await?;

    debug!(address = %address, nonce = %nonce, deadline = attestation.deadline, "Attestation issued");

    Ok(Json(SignResponse {
        score,
        tier: tier.as_u8(),
        attestation,
    }))
}

/// Farcaster frame action: resolve the caster's score by fid.
///
/// A payload without a fid, or with an fid no address is linked to, gets the
/// TOURIST default.
pub async fn frame_action(
    State(state): State<AppState>,
    payload: Result<Json<FrameRequest>, JsonRejection>,
) -> Result<Json<FrameResponse>, ApiError> {
    let Json(request) = payload?;
    let action = request.into_valid().map_err(ApiError::invalid)?;

    let record = action.fid.and_then(|fid| state.store.find_by_fid(fid));
    debug!(
        fid = ?action.fid,
        button_index = ?action.button_index,
        known = record.is_some(),
        "Frame action"
    );

    let (address, score, tier) = match record {
        Some(record) => (
            Some(record.score.address),
            record.score.total_score,
            record.score.tier,
        ),
        None => (None, 0, Tier::Tourist),
    };

    Ok(Json(FrameResponse {
        fid: action.fid,
        button_index: action.button_index,
        address,
        score,
        tier,
        mint_url: state.mint_url(),
    }))
}

// ============================================================================
// Router
// ============================================================================

/// Create the Oracle API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Scoring
        .route("/score", post(compute_score))
        .route("/score/{address}", get(get_score))
        // Attestation
        .route("/sign", post(sign_score))
        // Farcaster
        .route("/frame", post(frame_action))
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================
