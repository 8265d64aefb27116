//! Cryptographic utilities for the PVC Oracle
//!
//! Provides EIP-712 typed-data signing of score attestations:
//! - Fixed `UpdateScore` type layout shared with the registry contract
//! - Domain binding (name, version, chain id, verifying contract)
//! - One-hour deadline per attestation, caller-supplied nonce
//! - Signer recovery for self-checks

pub mod signing;

pub use signing::{
    Attestation, AttestationSigner, DomainConfig, DEFAULT_CHAIN_ID, DEFAULT_DOMAIN_NAME,
    PRIMARY_TYPE, UPDATE_SCORE_TYPE,
};
