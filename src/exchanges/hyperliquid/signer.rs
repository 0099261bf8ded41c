use super::types::{Action, ActionSignature};
use crate::core::errors::ExchangeError;
use crate::core::kernel::eth::{self, AbiToken, Address, Hash32};
use secp256k1::SecretKey;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Chain id of the EIP-712 domain for L1 actions, identical on mainnet and testnet
const L1_CHAIN_ID: u64 = 1337;
const AGENT_TYPE: &[u8] = b"Agent(string source,bytes32 connectionId)";

/// Signs L1 actions with a phantom `Agent` EIP-712 message
pub struct HyperliquidSigner {
    secret_key: SecretKey,
    address: Address,
    is_mainnet: bool,
    last_nonce: AtomicU64,
}

impl std::fmt::Debug for HyperliquidSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperliquidSigner")
            .field("address", &self.address())
            .field("is_mainnet", &self.is_mainnet)
            .finish_non_exhaustive()
    }
}

impl HyperliquidSigner {
    pub fn new(private_key: &str, is_mainnet: bool) -> Result<Self, ExchangeError> {
        let secret_key = eth::parse_private_key(private_key)?;
        Ok(Self {
            address: eth::address_of(&secret_key),
            secret_key,
            is_mainnet,
            last_nonce: AtomicU64::new(0),
        })
    }

    /// Address derived from the signing key
    pub fn address(&self) -> String {
        eth::format_address(&self.address)
    }

    pub const fn is_mainnet(&self) -> bool {
        self.is_mainnet
    }

    /// Millisecond nonce, strictly increasing across calls on this signer
    pub fn next_nonce(&self) -> Result<u64, ExchangeError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| ExchangeError::Other(format!("Failed to get timestamp: {}", e)))?;
        let previous = self
            .last_nonce
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Ok(now.max(previous + 1))
    }

    /// `keccak(msgpack(action) ‖ nonce ‖ vault flag [‖ vault])`
    pub fn action_hash(
        action: &Action,
        vault_address: Option<&Address>,
        nonce: u64,
    ) -> Result<Hash32, ExchangeError> {
        let mut data = rmp_serde::to_vec_named(action).map_err(|e| {
            ExchangeError::SerializationError(format!("Failed to encode action: {}", e))
        })?;
        data.extend_from_slice(&nonce.to_be_bytes());
        match vault_address {
            Some(vault) => {
                data.push(1);
                data.extend_from_slice(vault);
            }
            None => data.push(0),
        }
        Ok(eth::keccak256(&data))
    }

    /// EIP-712 digest of the phantom agent for `connection_id`
    pub fn agent_digest(connection_id: &Hash32, is_mainnet: bool) -> Hash32 {
        let source = if is_mainnet { "a" } else { "b" };
        let struct_hash = eth::keccak256(&eth::abi_encode(&[
            AbiToken::FixedBytes(eth::keccak256(AGENT_TYPE)),
            AbiToken::FixedBytes(eth::keccak256(source.as_bytes())),
            AbiToken::FixedBytes(*connection_id),
        ]));
        let domain = eth::eip712_domain_separator("Exchange", "1", L1_CHAIN_ID, &[0u8; 20]);
        eth::eip712_signing_hash(&domain, &struct_hash)
    }

    pub fn sign_l1_action(
        &self,
        action: &Action,
        vault_address: Option<&Address>,
        nonce: u64,
    ) -> Result<ActionSignature, ExchangeError> {
        let connection_id = Self::action_hash(action, vault_address, nonce)?;
        let digest = Self::agent_digest(&connection_id, self.is_mainnet);
        let signature = eth::sign_digest(&self.secret_key, &digest)?;
        Ok(ActionSignature {
            r: format!("0x{}", hex::encode(&signature[..32])),
            s: format!("0x{}", hex::encode(&signature[32..64])),
            v: signature[64],
        })
    }
}
