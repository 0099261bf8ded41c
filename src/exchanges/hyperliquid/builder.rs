use crate::core::config::{Credentials, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::eth;
use crate::core::kernel::{ReqwestRest, RestClientBuilder, RestClientConfig};
use crate::exchanges::hyperliquid::connector::HyperliquidConnector;
use crate::exchanges::hyperliquid::rest::HyperliquidRest;
use crate::exchanges::hyperliquid::signer::HyperliquidSigner;
use nonzero_ext::nonzero;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::info;

pub const MAINNET_API_URL: &str = "https://api.hyperliquid.xyz";
pub const TESTNET_API_URL: &str = "https://api.hyperliquid-testnet.xyz";

/// Builder for creating Hyperliquid connectors
pub struct HyperliquidBuilder {
    config: ExchangeConfig,
    vault_address: Option<String>,
}

impl HyperliquidBuilder {
    pub fn new(config: ExchangeConfig) -> Self {
        let vault_address = config.vault_address.clone();
        Self {
            config,
            vault_address,
        }
    }

    /// Set vault address for trading (optional)
    pub fn with_vault_address(mut self, vault_address: String) -> Self {
        self.vault_address = Some(vault_address);
        self
    }

    /// Signer plus the account to query. An explicit user address wins over
    /// the key's own address so API wallets can act for their owner.
    fn signer_and_account(
        &self,
    ) -> Result<(Option<Arc<HyperliquidSigner>>, Option<String>), ExchangeError> {
        match &self.config.credentials {
            Credentials::None => Ok((None, None)),
            Credentials::ApiKey { .. } => Err(ExchangeError::credential(
                "Hyperliquid requires a wallet private key, not an API key",
            )),
            Credentials::Wallet {
                user_address,
                signer_address,
                private_key,
            } => {
                let signer =
                    HyperliquidSigner::new(private_key.expose_secret(), !self.config.testnet)?;
                if let Some(expected) = signer_address.as_deref().filter(|s| !s.trim().is_empty())
                {
                    if eth::parse_address(expected)? != eth::parse_address(&signer.address())? {
                        return Err(ExchangeError::credential(format!(
                            "Private key does not belong to signer {}",
                            expected
                        )));
                    }
                }
                let account = if user_address.trim().is_empty() {
                    signer.address()
                } else {
                    eth::format_address(&eth::parse_address(user_address)?)
                };
                Ok((Some(Arc::new(signer)), Some(account)))
            }
        }
    }

    pub fn build(self) -> Result<HyperliquidConnector<ReqwestRest>, ExchangeError> {
        let (signer, account) = self.signer_and_account()?;

        let rest_config = RestClientConfig::new(
            self.config.resolve_base_url(MAINNET_API_URL, TESTNET_API_URL),
            "hyperliquid".to_string(),
        )
        .with_timeout(30)
        .with_rate_limit(nonzero!(10u32));
        let client = RestClientBuilder::new(rest_config).build()?;

        if let Some(signer) = &signer {
            info!(signer = %crate::core::config::mask(&signer.address()), mainnet = signer.is_mainnet(), "Signing enabled");
        }

        let mut rest = HyperliquidRest::new(client, signer, account);
        if let Some(vault_address) = &self.vault_address {
            rest = rest.with_vault_address(vault_address)?;
        }

        Ok(HyperliquidConnector::new(rest))
    }
}

/// Convenience function to build a Hyperliquid connector
pub fn build_connector(
    config: &ExchangeConfig,
) -> Result<HyperliquidConnector<ReqwestRest>, ExchangeError> {
    HyperliquidBuilder::new(config.clone()).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";

    #[test]
    fn test_account_defaults_to_key_address() {
        let config = ExchangeConfig::wallet(String::new(), None, KEY.to_string());
        let (signer, account) = HyperliquidBuilder::new(config).signer_and_account().unwrap();
        assert!(signer.is_some());
        assert_eq!(account.as_deref(), Some(ADDRESS));
    }

    #[test]
    fn test_mismatched_signer_address_is_rejected() {
        let config = ExchangeConfig::wallet(
            String::new(),
            Some("0x63dd5acc6b1aa0f563956c0e534dd30b6dcf7c4e".to_string()),
            KEY.to_string(),
        );
        assert!(matches!(
            build_connector(&config),
            Err(ExchangeError::CredentialError(_))
        ));
    }

    #[test]
    fn test_api_key_credentials_are_rejected() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string());
        assert!(matches!(
            build_connector(&config),
            Err(ExchangeError::CredentialError(_))
        ));
    }

    #[test]
    fn test_read_only_and_vault() {
        assert!(build_connector(&ExchangeConfig::read_only()).is_ok());
        let config = ExchangeConfig::wallet(String::new(), None, KEY.to_string())
            .vault_address("not-an-address".to_string());
        assert!(build_connector(&config).is_err());
    }
}
