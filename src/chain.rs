//! Registry contract access
//!
//! The verifying contract is the only authority on per-address nonces. The
//! signer never allocates nonces itself; request handlers read them through
//! [`NonceSource`] right before signing.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::address::Address;
use crate::error::{PvcError, Result};

abigen!(
    ReputationRegistry,
    r#"[
        function nonces(address user) external view returns (uint256)
        function oracle() external view returns (address)
    ]"#
);

/// Read-through to the registry's `nonces(address)` view.
#[async_trait]
pub trait NonceSource: Send + Sync {
    async fn nonce_of(&self, user: &Address) -> Result<U256>;
}

/// JSON-RPC client for the deployed registry.
#[derive(Clone)]
pub struct RegistryClient {
    contract: ReputationRegistry<Provider<Http>>,
    registry: Address,
}

impl RegistryClient {
    pub fn new(rpc_url: &str, registry: &Address) -> AnyResult<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("invalid rpc url: {rpc_url}"))?;
        let contract = ReputationRegistry::new(registry.to_h160(), Arc::new(provider));

        Ok(Self {
            contract,
            registry: registry.clone(),
        })
    }

    pub fn registry(&self) -> &Address {
        &self.registry
    }

    /// The oracle address the contract will accept signatures from.
    pub async fn oracle_address(&self) -> Result<Address> {
        self.contract
            .oracle()
            .call()
            .await
            .map(Address::from)
            .map_err(|e| PvcError::UpstreamNonceFetch(e.to_string()))
    }
}

#[async_trait]
impl NonceSource for RegistryClient {
    async fn nonce_of(&self, user: &Address) -> Result<U256> {
        let nonce = self
            .contract
            .nonces(user.to_h160())
            .call()
            .await
            .map_err(|e| PvcError::UpstreamNonceFetch(e.to_string()))?;

        debug!(user = %user, nonce = %nonce, registry = %self.registry, "Fetched registry nonce");
        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_rpc_url() {
        assert!(RegistryClient::new("not a url", &Address::zero()).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_rpc_maps_to_upstream_error() {
        // Port 9 (discard) on localhost; nothing answers JSON-RPC there.
        let client = RegistryClient::new("http://127.0.0.1:9", &Address::zero()).unwrap();
        let user = Address::parse("0xd8da6bf26964af9d7eed9e03e53415d37aa96045").unwrap();

        let err = client.nonce_of(&user).await.unwrap_err();
        assert!(matches!(err, PvcError::UpstreamNonceFetch(_)));
        assert!(err.is_retryable());
    }
}
