use crate::core::config::{mask, DEFAULT_RECV_WINDOW};
use crate::core::errors::ExchangeError;
use crate::core::kernel::eth::{self, AbiToken, Address};
use hmac::{Hmac, Mac};
use secp256k1::SecretKey;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

/// Ordered request parameters. Order is significant for signing.
pub type Params = Vec<(String, String)>;

/// Build a parameter pair from anything printable
pub fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Encode parameters in insertion order as `k=v&k=v`.
///
/// Signers and the transport both go through this function, so the signed
/// string and the transmitted query/body are the same bytes.
pub fn encode_params(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// An authenticated request, ready for transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Exactly what goes on the wire, in order, signature included
    pub params: Params,
    pub headers: Vec<(String, String)>,
    pub timestamp: u64,
    pub nonce: Option<u64>,
    pub signature: String,
    /// Masked key prefix or signer address
    pub signer_identity: String,
}

impl SignedEnvelope {
    pub fn encoded(&self) -> String {
        encode_params(&self.params)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Signer trait for request authentication
///
/// Implementations are pure given `timestamp`; any additional time material
/// (such as a microsecond nonce) is read once inside `sign_request` and used
/// for both the signature and the returned parameters.
pub trait Signer: Send + Sync {
    /// Sign a request and return the envelope to transmit
    ///
    /// # Arguments
    /// * `method` - HTTP method (GET, POST, etc.)
    /// * `endpoint` - API endpoint path
    /// * `params` - Business parameters in the order they must be sent
    /// * `timestamp` - Request timestamp in milliseconds
    fn sign_request(
        &self,
        method: &str,
        endpoint: &str,
        params: &[(String, String)],
        timestamp: u64,
    ) -> Result<SignedEnvelope, ExchangeError>;

    fn identity(&self) -> String;
}

fn has_param(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

/// HMAC-SHA256 signer for query-string authenticated exchanges
pub struct HmacSigner {
    api_key: String,
    secret_key: String,
    api_key_header: &'static str,
    recv_window: u64,
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("api_key", &mask(&self.api_key))
            .field("api_key_header", &self.api_key_header)
            .field("recv_window", &self.recv_window)
            .finish_non_exhaustive()
    }
}

impl HmacSigner {
    /// Create a new HMAC signer; fails fast when either secret is missing
    pub fn new(api_key: String, secret_key: String) -> Result<Self, ExchangeError> {
        if api_key.trim().is_empty() {
            return Err(ExchangeError::credential("API key is required"));
        }
        if secret_key.trim().is_empty() {
            return Err(ExchangeError::credential("Secret key is required"));
        }
        Ok(Self {
            api_key,
            secret_key,
            api_key_header: "X-MBX-APIKEY",
            recv_window: DEFAULT_RECV_WINDOW,
        })
    }

    #[must_use]
    pub const fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    #[must_use]
    pub const fn with_api_key_header(mut self, header: &'static str) -> Self {
        self.api_key_header = header;
        self
    }

    /// Hex HMAC-SHA256 of `payload`
    pub fn signature_for(&self, payload: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| ExchangeError::credential(format!("Invalid secret key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl Signer for HmacSigner {
    fn sign_request(
        &self,
        _method: &str,
        _endpoint: &str,
        params: &[(String, String)],
        timestamp: u64,
    ) -> Result<SignedEnvelope, ExchangeError> {
        let mut signed = params.to_vec();
        if !has_param(&signed, "recvWindow") {
            signed.push(param("recvWindow", self.recv_window));
        }
        if !has_param(&signed, "timestamp") {
            signed.push(param("timestamp", timestamp));
        }

        let signature = self.signature_for(&encode_params(&signed))?;
        signed.push(param("signature", &signature));

        Ok(SignedEnvelope {
            params: signed,
            headers: vec![(self.api_key_header.to_string(), self.api_key.clone())],
            timestamp,
            nonce: None,
            signature,
            signer_identity: mask(&self.api_key),
        })
    }

    fn identity(&self) -> String {
        mask(&self.api_key)
    }
}

/// Delegated-wallet signer (EIP-191 over an ABI-encoded, key-sorted JSON payload).
///
/// The account owner (`user`) authorizes an API wallet (`signer`) whose private
/// key signs each request.
pub struct WalletSigner {
    user: Address,
    signer: Address,
    secret_key: SecretKey,
    recv_window: u64,
}

impl std::fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSigner")
            .field("user", &eth::format_address(&self.user))
            .field("signer", &eth::format_address(&self.signer))
            .field("recv_window", &self.recv_window)
            .finish_non_exhaustive()
    }
}

impl WalletSigner {
    /// Validate all credential material up front
    pub fn new(
        user_address: &str,
        signer_address: Option<&str>,
        private_key: &str,
    ) -> Result<Self, ExchangeError> {
        if user_address.trim().is_empty() {
            return Err(ExchangeError::credential("User address is required"));
        }
        let signer_address = signer_address
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExchangeError::credential("Signer address is required"))?;

        let secret_key = eth::parse_private_key(private_key)?;
        let signer = eth::parse_address(signer_address)?;
        if eth::address_of(&secret_key) != signer {
            return Err(ExchangeError::credential(format!(
                "Private key does not belong to signer {}",
                signer_address
            )));
        }

        Ok(Self {
            user: eth::parse_address(user_address)?,
            signer,
            secret_key,
            recv_window: DEFAULT_RECV_WINDOW,
        })
    }

    #[must_use]
    pub const fn with_recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    pub fn user_address(&self) -> String {
        eth::format_address(&self.user)
    }

    pub fn signer_address(&self) -> String {
        eth::format_address(&self.signer)
    }

    /// Compact JSON of the parameters with lexicographically sorted keys and
    /// every value as a string. Values are embedded verbatim.
    pub fn canonical_json(params: &[(String, String)]) -> Result<String, ExchangeError> {
        let sorted: BTreeMap<&str, &str> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        serde_json::to_string(&sorted).map_err(|e| ExchangeError::SerializationError(e.to_string()))
    }

    /// `keccak(abi.encode(json, user, signer, nonce))`
    pub fn payload_hash(&self, json: &str, nonce: u64) -> eth::Hash32 {
        eth::keccak256(&eth::abi_encode(&[
            AbiToken::String(json.to_string()),
            AbiToken::Address(self.user),
            AbiToken::Address(self.signer),
            AbiToken::Uint(u128::from(nonce)),
        ]))
    }

    /// Deterministic core of the scheme
    pub fn sign_with_nonce(
        &self,
        params: &[(String, String)],
        timestamp: u64,
        nonce: u64,
    ) -> Result<SignedEnvelope, ExchangeError> {
        let mut signed = params.to_vec();
        if !has_param(&signed, "recvWindow") {
            signed.push(param("recvWindow", self.recv_window));
        }
        if !has_param(&signed, "timestamp") {
            signed.push(param("timestamp", timestamp));
        }

        let json = Self::canonical_json(&signed)?;
        let hash = self.payload_hash(&json, nonce);
        let digest = eth::personal_message_hash(&hash);
        let signature = format!("0x{}", hex::encode(eth::sign_digest(&self.secret_key, &digest)?));

        signed.push(param("nonce", nonce));
        signed.push(param("user", self.user_address()));
        signed.push(param("signer", self.signer_address()));
        signed.push(param("signature", &signature));

        Ok(SignedEnvelope {
            params: signed,
            headers: Vec::new(),
            timestamp,
            nonce: Some(nonce),
            signature,
            signer_identity: self.signer_address(),
        })
    }
}

/// Wall clock in microseconds
pub fn micros_now() -> Result<u64, ExchangeError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .map_err(|e| ExchangeError::Other(format!("Failed to get timestamp: {}", e)))
}

impl Signer for WalletSigner {
    fn sign_request(
        &self,
        _method: &str,
        _endpoint: &str,
        params: &[(String, String)],
        timestamp: u64,
    ) -> Result<SignedEnvelope, ExchangeError> {
        self.sign_with_nonce(params, timestamp, micros_now()?)
    }

    fn identity(&self) -> String {
        self.signer_address()
    }
}
