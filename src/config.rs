use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::address::Address;
use crate::crypto::{DEFAULT_CHAIN_ID, DEFAULT_DOMAIN_NAME, DomainConfig};

/// Configuration for the PVC oracle service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chain and EIP-712 domain configuration
    pub chain: ChainConfig,
    /// Oracle signing key
    pub signer: SignerConfig,
    /// Request guards
    pub security: SecurityConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Public base URL; frame responses link to `{base_url}/mint`
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint for registry reads
    pub rpc_url: String,
    pub chain_id: u64,
    /// Verifying contract for attestations
    pub registry_address: Address,
    pub domain_name: String,
    pub domain_version: String,
    /// Upper bound on a single nonce read
    pub rpc_timeout_secs: u64,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Hex private key. Never serialized or printed.
    #[serde(skip_serializing, default)]
    pub private_key: Option<String>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Rate limit per minute per IP
    pub rate_limit_per_minute: u32,
    /// Maximum request body size in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Mask addresses and client IPs in logs
    pub sanitize_logs: bool,
    /// Enable request/response logging
    pub log_requests: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8787,
                base_url: "http://localhost:8787".to_string(),
            },
            chain: ChainConfig {
                rpc_url: "https://mainnet.base.org".to_string(),
                chain_id: DEFAULT_CHAIN_ID,
                registry_address: Address::zero(),
                domain_name: DEFAULT_DOMAIN_NAME.to_string(),
                domain_version: "1".to_string(),
                rpc_timeout_secs: 10,
            },
            signer: SignerConfig::default(),
            security: SecurityConfig {
                rate_limit_per_minute: 100,
                max_request_size: 64 * 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                sanitize_logs: true,
                log_requests: false,
            },
        }
    }
}

fn parse_var<T>(value: &str, name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid {name} value"))
}

impl OracleConfig {
    /// Load configuration from `PVC_*` environment variables and validate it
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`OracleConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Server configuration
        if let Some(host) = lookup("PVC_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("PVC_PORT") {
            config.server.port = parse_var(&port, "PVC_PORT")?;
        }
        if let Some(base_url) = lookup("PVC_BASE_URL") {
            config.server.base_url = base_url;
        }

        // Chain configuration
        if let Some(rpc_url) = lookup("PVC_RPC_URL") {
            config.chain.rpc_url = rpc_url;
        }
        if let Some(chain_id) = lookup("PVC_CHAIN_ID") {
            config.chain.chain_id = parse_var(&chain_id, "PVC_CHAIN_ID")?;
        }
        if let Some(registry) = lookup("PVC_REGISTRY_ADDRESS") {
            config.chain.registry_address = Address::parse(registry.trim())
                .context("Invalid PVC_REGISTRY_ADDRESS value")?;
        }
        if let Some(timeout) = lookup("PVC_RPC_TIMEOUT_SECS") {
            config.chain.rpc_timeout_secs = parse_var(&timeout, "PVC_RPC_TIMEOUT_SECS")?;
        }

        // Signing key: optional, but every sign call fails without it
        config.signer.private_key = lookup("PVC_ORACLE_PRIVATE_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        // Security configuration
        if let Some(limit) = lookup("PVC_RATE_LIMIT_PER_MINUTE") {
            config.security.rate_limit_per_minute =
                parse_var(&limit, "PVC_RATE_LIMIT_PER_MINUTE")?;
        }
        if let Some(size) = lookup("PVC_MAX_REQUEST_SIZE") {
            config.security.max_request_size = parse_var(&size, "PVC_MAX_REQUEST_SIZE")?;
        }

        // Logging configuration
        if let Some(level) = lookup("PVC_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(log_requests) = lookup("PVC_LOG_REQUESTS") {
            config.logging.log_requests = parse_var(&log_requests, "PVC_LOG_REQUESTS")?;
        }
        if let Some(sanitize) = lookup("PVC_SANITIZE_LOGS") {
            config.logging.sanitize_logs = parse_var(&sanitize, "PVC_SANITIZE_LOGS")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let base = Url::parse(&self.server.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.server.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "Base URL must be http or https, got: {}",
                base.scheme()
            ));
        }

        let rpc = Url::parse(&self.chain.rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", self.chain.rpc_url))?;
        if !matches!(rpc.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "RPC URL must be http or https, got: {}",
                rpc.scheme()
            ));
        }

        if self.chain.chain_id == 0 {
            return Err(anyhow::anyhow!("Chain id cannot be 0"));
        }
        if self.chain.rpc_timeout_secs == 0 {
            return Err(anyhow::anyhow!("RPC timeout cannot be 0"));
        }
        if self.security.rate_limit_per_minute == 0 {
            return Err(anyhow::anyhow!("Rate limit must be at least 1 request per minute"));
        }
        if self.security.max_request_size == 0 {
            return Err(anyhow::anyhow!("Maximum request size cannot be 0"));
        }

        Ok(())
    }

    /// Settings that are allowed but degrade the service. Loading runs before
    /// tracing is installed, so the caller logs these.
    pub fn startup_warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if self.signer.private_key.is_none() {
            warnings.push("PVC_ORACLE_PRIVATE_KEY not set; attestation signing is disabled");
        }
        if self.chain.registry_address.is_zero() {
            warnings.push("PVC_REGISTRY_ADDRESS not set; attestations will name the zero address");
        }
        warnings
    }

    /// EIP-712 domain the signer binds attestations to
    pub fn to_domain(&self) -> DomainConfig {
        DomainConfig {
            name: self.chain.domain_name.clone(),
            version: self.chain.domain_version.clone(),
            chain_id: self.chain.chain_id,
            verifying_contract: self.chain.registry_address.clone(),
        }
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.chain.rpc_timeout_secs)
    }
}

/// Mask a sensitive value (address, key, client IP) for logging, keeping a
/// short prefix and suffix.
pub fn sanitize_for_logging(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 10 {
        return "*".repeat(chars.len());
    }

    let prefix = if data.starts_with("0x") { 6 } else { 4 };
    let head: String = chars[..prefix].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
