use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip712::{EIP712Domain, Eip712, Eip712DomainType, TypedData, Types};
use ethers::types::{Signature, H256, U256};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::address::Address;
use crate::error::{PvcError, Result};
use crate::scoring::constants::ATTESTATION_TTL_SECS;
use crate::scoring::Tier;

/// EIP-712 primary type understood by the registry contract.
pub const PRIMARY_TYPE: &str = "UpdateScore";

/// Canonical type string. Field order and types must match the registry's
/// type hash exactly.
pub const UPDATE_SCORE_TYPE: &str =
    "UpdateScore(address user,uint256 score,uint8 tier,uint256 nonce,uint256 deadline)";

/// Domain name used by the deployed registry.
pub const DEFAULT_DOMAIN_NAME: &str = "The Base Standard";
/// Base mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 8453;

/// EIP-712 domain of the verifying contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainConfig {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DOMAIN_NAME.to_string(),
            version: "1".to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract: Address::zero(),
        }
    }
}

impl DomainConfig {
    pub fn to_eip712(&self) -> EIP712Domain {
        EIP712Domain {
            name: Some(self.name.clone()),
            version: Some(self.version.clone()),
            chain_id: Some(U256::from(self.chain_id)),
            verifying_contract: Some(self.verifying_contract.to_h160()),
            salt: None,
        }
    }
}

/// Oracle-signed score update, valid until `deadline`.
///
/// Serializes as `{signature: "0x…", deadline: "<dec>", nonce: "<dec>"}`.
#[derive(Debug, Clone, Serialize)]
pub struct Attestation {
    #[serde(serialize_with = "serialize_signature")]
    pub signature: Signature,
    #[serde(serialize_with = "serialize_decimal")]
    pub deadline: u64,
    #[serde(serialize_with = "serialize_decimal")]
    pub nonce: U256,
    /// The exact typed-data payload that was signed.
    #[serde(skip)]
    pub typed_data: TypedData,
}

impl Attestation {
    pub fn signature_hex(&self) -> String {
        signature_to_hex(&self.signature)
    }
}

/// 0x-prefixed r || s || v
fn signature_to_hex(sig: &Signature) -> String {
    format!("0x{}", hex::encode(sig.to_vec()))
}

fn serialize_signature<S: Serializer>(sig: &Signature, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&signature_to_hex(sig))
}

fn serialize_decimal<T: ToString, S: Serializer>(
    value: &T,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

fn field(name: &str, ty: &str) -> Eip712DomainType {
    Eip712DomainType {
        name: name.to_string(),
        r#type: ty.to_string(),
    }
}

fn update_score_types() -> Types {
    let mut types = BTreeMap::new();
    types.insert(
        "EIP712Domain".to_string(),
        vec![
            field("name", "string"),
            field("version", "string"),
            field("chainId", "uint256"),
            field("verifyingContract", "address"),
        ],
    );
    types.insert(
        PRIMARY_TYPE.to_string(),
        vec![
            field("user", "address"),
            field("score", "uint256"),
            field("tier", "uint8"),
            field("nonce", "uint256"),
            field("deadline", "uint256"),
        ],
    );
    types
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

/// Produces EIP-712 `UpdateScore` attestations with the oracle key.
///
/// Stateless apart from the read-only key and domain: no nonce tracking, no
/// caching. Callers supply the on-chain nonce read immediately beforehand.
#[derive(Debug, Clone)]
pub struct AttestationSigner {
    wallet: Option<LocalWallet>,
    domain: DomainConfig,
}

impl AttestationSigner {
    /// Build a signer from a hex private key (with or without `0x`).
    pub fn new(private_key: Option<&str>, domain: DomainConfig) -> Result<Self> {
        let wallet = match private_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => {
                let key = key.strip_prefix("0x").unwrap_or(key);
                let wallet = key
                    .parse::<LocalWallet>()
                    .map_err(|e| PvcError::Signing(format!("invalid oracle key: {e}")))?
                    .with_chain_id(domain.chain_id);
                Some(wallet)
            }
            None => None,
        };

        Ok(Self { wallet, domain })
    }

    /// A signer with no key; every `sign` call fails with `MissingSigningKey`.
    pub fn without_key(domain: DomainConfig) -> Self {
        Self {
            wallet: None,
            domain,
        }
    }

    pub fn domain(&self) -> &DomainConfig {
        &self.domain
    }

    pub fn has_key(&self) -> bool {
        self.wallet.is_some()
    }

    /// Address of the oracle key, if configured.
    pub fn signer_address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| Address::from(w.address()))
    }

    /// Assemble the typed-data payload for one score update.
    pub fn typed_data(
        &self,
        user: &Address,
        score: u32,
        tier: Tier,
        nonce: U256,
        deadline: u64,
    ) -> TypedData {
        let mut message = BTreeMap::new();
        message.insert("user".to_string(), Value::String(user.to_string()));
        message.insert("score".to_string(), Value::String(score.to_string()));
        message.insert("tier".to_string(), Value::from(tier.as_u8()));
        message.insert("nonce".to_string(), Value::String(nonce.to_string()));
        message.insert("deadline".to_string(), Value::String(deadline.to_string()));

        TypedData {
            domain: self.domain.to_eip712(),
            types: update_score_types(),
            primary_type: PRIMARY_TYPE.to_string(),
            message,
        }
    }

    /// Sign a score update valid for one hour from now.
    pub async fn sign(
        &self,
        user: &Address,
        score: u32,
        tier: Tier,
        nonce: U256,
    ) -> Result<Attestation> {
        let deadline = unix_now() + ATTESTATION_TTL_SECS;
        self.sign_until(user, score, tier, nonce, deadline).await
    }

    async fn sign_until(
        &self,
        user: &Address,
        score: u32,
        tier: Tier,
        nonce: U256,
        deadline: u64,
    ) -> Result<Attestation> {
        let wallet = self.wallet.as_ref().ok_or(PvcError::MissingSigningKey)?;

        let typed_data = self.typed_data(user, score, tier, nonce, deadline);
        let signature = wallet
            .sign_typed_data(&typed_data)
            .await
            .map_err(|e| PvcError::Signing(e.to_string()))?;

        info!(
            user = %user,
            score,
            tier = %tier,
            nonce = %nonce,
            deadline,
            "Issued score attestation"
        );

        Ok(Attestation {
            signature,
            deadline,
            nonce,
            typed_data,
        })
    }

    /// Recover the address that produced an attestation.
    pub fn recover(attestation: &Attestation) -> Result<Address> {
        let digest = attestation
            .typed_data
            .encode_eip712()
            .map_err(|e| PvcError::Signing(e.to_string()))?;
        let signer = attestation
            .signature
            .recover(H256::from(digest))
            .map_err(|e| PvcError::Signing(e.to_string()))?;

        debug!(signer = %Address::from(signer), "Recovered attestation signer");
        Ok(Address::from(signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{self, Token};
    use ethers::types::transaction::eip712::encode_type;
    use ethers::utils::keccak256;

    const TEST_KEY: &str = "0x1234567890123456789012345678901234567890123456789012345678901234";
    const REGISTRY: &str = "0x1234567890123456789012345678901234567890";
    const USER: &str = "0xabc123def4567890123456789012345678901234";

    fn domain() -> DomainConfig {
        DomainConfig {
            verifying_contract: Address::parse(REGISTRY).unwrap(),
            ..DomainConfig::default()
        }
    }

    fn signer() -> AttestationSigner {
        AttestationSigner::new(Some(TEST_KEY), domain()).unwrap()
    }

    #[test]
    fn test_type_string_matches_contract() {
        let encoded = encode_type(PRIMARY_TYPE, &update_score_types()).unwrap();
        assert_eq!(encoded, UPDATE_SCORE_TYPE);
    }

    #[test]
    fn test_typed_data_fields() {
        let user = Address::parse(USER).unwrap();
        let typed = signer().typed_data(&user, 865, Tier::Based, U256::from(7u64), 1_700_000_000);

        assert_eq!(typed.primary_type, "UpdateScore");
        assert_eq!(typed.domain.name.as_deref(), Some("The Base Standard"));
        assert_eq!(typed.domain.version.as_deref(), Some("1"));
        assert_eq!(typed.domain.chain_id, Some(U256::from(8453u64)));
        assert_eq!(typed.message["user"], USER);
        assert_eq!(typed.message["score"], "865");
        assert_eq!(typed.message["tier"], 3);
        assert_eq!(typed.message["nonce"], "7");
        assert_eq!(typed.message["deadline"], "1700000000");
    }

    #[test]
    fn test_digest_matches_manual_encoding() {
        let user = Address::parse(USER).unwrap();
        let nonce = U256::from(42u64);
        let deadline = 1_700_003_600u64;
        let typed = signer().typed_data(&user, 865, Tier::Based, nonce, deadline);

        let domain_type_hash = keccak256(
            "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let domain_separator = keccak256(abi::encode(&[
            Token::FixedBytes(domain_type_hash.to_vec()),
            Token::FixedBytes(keccak256("The Base Standard").to_vec()),
            Token::FixedBytes(keccak256("1").to_vec()),
            Token::Uint(U256::from(8453u64)),
            Token::Address(Address::parse(REGISTRY).unwrap().to_h160()),
        ]));
        let struct_hash = keccak256(abi::encode(&[
            Token::FixedBytes(keccak256(UPDATE_SCORE_TYPE).to_vec()),
            Token::Address(user.to_h160()),
            Token::Uint(U256::from(865u64)),
            Token::Uint(U256::from(3u64)),
            Token::Uint(nonce),
            Token::Uint(U256::from(deadline)),
        ]));
        let expected = keccak256([&[0x19u8, 0x01][..], &domain_separator[..], &struct_hash[..]].concat());

        assert_eq!(typed.encode_eip712().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_sign_and_recover() {
        let signer = signer();
        let user = Address::parse(USER).unwrap();
        let before = unix_now();

        let attestation = signer
            .sign(&user, 865, Tier::Based, U256::zero())
            .await
            .unwrap();

        assert!(attestation.deadline > before);
        assert!(attestation.deadline >= before + ATTESTATION_TTL_SECS);
        assert_eq!(attestation.nonce, U256::zero());
        assert_eq!(attestation.typed_data.primary_type, PRIMARY_TYPE);
        assert_eq!(attestation.typed_data.message["nonce"], "0");
        assert_eq!(attestation.signature_hex().len(), 2 + 65 * 2);

        let recovered = AttestationSigner::recover(&attestation).unwrap();
        assert_eq!(Some(recovered), signer.signer_address());
    }

    #[tokio::test]
    async fn test_nonce_is_embedded_verbatim() {
        let user = Address::parse(USER).unwrap();
        let nonce = U256::MAX;
        let attestation = signer().sign(&user, 10, Tier::Tourist, nonce).await.unwrap();

        assert_eq!(attestation.nonce, nonce);
        assert_eq!(attestation.typed_data.message["nonce"], nonce.to_string());
    }

    #[tokio::test]
    async fn test_signature_is_deterministic_for_fixed_deadline() {
        let signer = signer();
        let user = Address::parse(USER).unwrap();
        let a = signer
            .sign_until(&user, 500, Tier::Resident, U256::one(), 1_800_000_000)
            .await
            .unwrap();
        let b = signer
            .sign_until(&user, 500, Tier::Resident, U256::one(), 1_800_000_000)
            .await
            .unwrap();
        let c = signer
            .sign_until(&user, 500, Tier::Resident, U256::one(), 1_800_000_001)
            .await
            .unwrap();

        assert_eq!(a.signature, b.signature);
        assert_ne!(a.signature, c.signature);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let signer = AttestationSigner::without_key(domain());
        let user = Address::parse(USER).unwrap();
        let err = signer
            .sign(&user, 865, Tier::Based, U256::zero())
            .await
            .unwrap_err();
        assert_eq!(err, PvcError::MissingSigningKey);

        let blank = AttestationSigner::new(Some("  "), domain()).unwrap();
        assert!(!blank.has_key());
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(matches!(
            AttestationSigner::new(Some("0xnothex"), domain()),
            Err(PvcError::Signing(_))
        ));
    }

    #[tokio::test]
    async fn test_attestation_wire_format() {
        let user = Address::parse(USER).unwrap();
        let attestation = signer()
            .sign(&user, 865, Tier::Based, U256::from(5u64))
            .await
            .unwrap();
        let json = serde_json::to_value(&attestation).unwrap();

        assert_eq!(json["nonce"], "5");
        assert_eq!(json["deadline"], attestation.deadline.to_string());
        assert_eq!(json["signature"], attestation.signature_hex());
        assert!(json["signature"].as_str().unwrap().starts_with("0x"));
        assert!(json.get("typed_data").is_none());
    }
}
