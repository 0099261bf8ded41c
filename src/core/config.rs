use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Default acceptable clock skew, in milliseconds, sent as `recvWindow`.
pub const DEFAULT_RECV_WINDOW: u64 = 5000;

/// Secret material for one exchange.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Public endpoints only.
    None,
    /// HMAC exchanges.
    ApiKey {
        api_key: Secret<String>,
        secret_key: Secret<String>,
    },
    /// Wallet-signed exchanges. `signer_address` is the delegated API wallet when
    /// the venue separates it from the account owner.
    Wallet {
        user_address: String,
        signer_address: Option<String>,
        private_key: Secret<String>,
    },
}

impl Credentials {
    #[must_use]
    pub fn api_key(api_key: String, secret_key: String) -> Self {
        Self::ApiKey {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
        }
    }

    #[must_use]
    pub fn wallet(
        user_address: String,
        signer_address: Option<String>,
        private_key: String,
    ) -> Self {
        Self::Wallet {
            user_address,
            signer_address,
            private_key: Secret::new(private_key),
        }
    }

    /// Short, non-secret prefix suitable for diagnostics
    pub fn masked_identity(&self) -> String {
        match self {
            Self::None => "anonymous".to_string(),
            Self::ApiKey { api_key, .. } => mask(api_key.expose_secret()),
            Self::Wallet {
                user_address,
                signer_address,
                ..
            } => mask(signer_address.as_deref().unwrap_or(user_address)),
        }
    }
}

pub(crate) fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(6).collect();
    format!("{}***", prefix)
}

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub credentials: Credentials,
    pub testnet: bool,
    pub base_url: Option<String>,
    pub recv_window: u64,
    pub vault_address: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 5)?;
        state.serialize_field("credentials", &self.credentials.masked_identity())?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("recv_window", &self.recv_window)?;
        state.serialize_field("vault_address", &self.vault_address)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: Option<String>,
            secret_key: Option<String>,
            user_address: Option<String>,
            signer_address: Option<String>,
            private_key: Option<String>,
            #[serde(default)]
            testnet: bool,
            base_url: Option<String>,
            recv_window: Option<u64>,
            vault_address: Option<String>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        let credentials = match (helper.api_key, helper.secret_key, helper.private_key) {
            (Some(api_key), Some(secret_key), _) => Credentials::api_key(api_key, secret_key),
            (_, _, Some(private_key)) => Credentials::wallet(
                helper.user_address.unwrap_or_default(),
                helper.signer_address,
                private_key,
            ),
            _ => Credentials::None,
        };

        Ok(Self {
            credentials,
            testnet: helper.testnet,
            base_url: helper.base_url,
            recv_window: helper.recv_window.unwrap_or(DEFAULT_RECV_WINDOW),
            vault_address: helper.vault_address,
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with HMAC API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self::with_credentials(Credentials::api_key(api_key, secret_key))
    }

    /// Create a new configuration for a wallet-signed exchange
    #[must_use]
    pub fn wallet(
        user_address: String,
        signer_address: Option<String>,
        private_key: String,
    ) -> Self {
        Self::with_credentials(Credentials::wallet(
            user_address,
            signer_address,
            private_key,
        ))
    }

    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials,
            testnet: false,
            base_url: None,
            recv_window: DEFAULT_RECV_WINDOW,
            vault_address: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{EXCHANGE}_API_KEY` and `{EXCHANGE}_SECRET_KEY` for HMAC exchanges, or
    /// - `{EXCHANGE}_PRIVATE_KEY`, `{EXCHANGE}_USER_ADDRESS` and optionally
    ///   `{EXCHANGE}_SIGNER_ADDRESS` for wallet-signed exchanges
    /// - `{EXCHANGE}_TESTNET` (optional, defaults to false)
    /// - `{EXCHANGE}_BASE_URL`, `{EXCHANGE}_VAULT_ADDRESS`, `{EXCHANGE}_RECV_WINDOW` (optional)
    pub fn from_env(exchange_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = exchange_prefix.to_uppercase();
        let var = |name: &str| env::var(format!("{}_{}", prefix, name)).ok();

        let credentials = if let Some(private_key) = var("PRIVATE_KEY") {
            let user_address = var("USER_ADDRESS").ok_or_else(|| {
                ConfigError::MissingEnvironmentVariable(format!("{}_USER_ADDRESS", prefix))
            })?;
            Credentials::wallet(user_address, var("SIGNER_ADDRESS"), private_key)
        } else {
            let api_key = var("API_KEY").ok_or_else(|| {
                ConfigError::MissingEnvironmentVariable(format!("{}_API_KEY", prefix))
            })?;
            let secret_key = var("SECRET_KEY").ok_or_else(|| {
                ConfigError::MissingEnvironmentVariable(format!("{}_SECRET_KEY", prefix))
            })?;
            Credentials::api_key(api_key, secret_key)
        };

        let testnet = var("TESTNET")
            .unwrap_or_else(|| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        let recv_window = match var("RECV_WINDOW") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{}_RECV_WINDOW must be an integer, got '{}'",
                    prefix, raw
                ))
            })?,
            None => DEFAULT_RECV_WINDOW,
        };

        Ok(Self {
            credentials,
            testnet,
            base_url: var("BASE_URL"),
            recv_window,
            vault_address: var("VAULT_ADDRESS"),
        })
    }

    /// Create configuration for read-only operations (market data only)
    #[must_use]
    pub fn read_only() -> Self {
        Self::with_credentials(Credentials::None)
    }

    /// Check if this configuration has credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !matches!(self.credentials, Credentials::None)
    }

    /// Set testnet mode
    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub const fn recv_window(mut self, recv_window: u64) -> Self {
        self.recv_window = recv_window;
        self
    }

    #[must_use]
    pub fn vault_address(mut self, vault_address: String) -> Self {
        self.vault_address = Some(vault_address);
        self
    }

    /// Resolve the base URL: explicit override, then testnet, then mainnet
    pub fn resolve_base_url(&self, mainnet: &str, testnet: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| {
            if self.testnet {
                testnet.to_string()
            } else {
                mainnet.to_string()
            }
        })
    }

    pub fn masked_identity(&self) -> String {
        self.credentials.masked_identity()
    }
}

/// Load a .env file, tolerating its absence
#[cfg(feature = "env-file")]
pub fn load_env_file(env_file_path: &str) -> Result<(), ConfigError> {
    match dotenv::from_path(env_file_path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigError::InvalidConfiguration(format!(
            "Failed to load .env file '{}': {}",
            env_file_path, e
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
