use crate::core::config::{Credentials, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, Signer, WalletSigner};
use crate::exchanges::binance_perp::builder::assemble;
use crate::exchanges::binance_perp::{BinancePerpConnector, FuturesEndpoints};
use nonzero_ext::nonzero;
use secrecy::ExposeSecret;
use std::sync::Arc;

pub const MAINNET_URL: &str = "https://fapi.asterdex.com";
/// Aster has no public futures testnet; testnet mode needs an explicit base URL
pub const TESTNET_URL: &str = MAINNET_URL;

/// Aster Pro API connector: Binance-style routes signed by a delegated API wallet
pub type AsterConnector<R> = BinancePerpConnector<R>;

pub fn build_connector(config: &ExchangeConfig) -> Result<AsterConnector<ReqwestRest>, ExchangeError> {
    let signer: Option<Arc<dyn Signer>> = match &config.credentials {
        Credentials::None => None,
        Credentials::Wallet {
            user_address,
            signer_address,
            private_key,
        } => Some(Arc::new(
            WalletSigner::new(
                user_address,
                signer_address.as_deref(),
                private_key.expose_secret(),
            )?
            .with_recv_window(config.recv_window),
        )),
        Credentials::ApiKey { .. } => {
            return Err(ExchangeError::credential(
                "Aster Pro API requires user, signer and signer private key",
            ))
        }
    };

    assemble(
        config.resolve_base_url(MAINNET_URL, TESTNET_URL),
        FuturesEndpoints::ASTER,
        signer,
        nonzero!(10u32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const SIGNER_ADDRESS: &str = "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23";
    const USER_ADDRESS: &str = "0x63dd5acc6b1aa0f563956c0e534dd30b6dcf7c4e";

    #[test]
    fn test_builds_with_delegated_wallet() {
        let config = ExchangeConfig::wallet(
            USER_ADDRESS.to_string(),
            Some(SIGNER_ADDRESS.to_string()),
            SIGNER_KEY.to_string(),
        );
        assert!(build_connector(&config).is_ok());
    }

    #[test]
    fn test_missing_signer_address_is_rejected() {
        let config = ExchangeConfig::wallet(USER_ADDRESS.to_string(), None, SIGNER_KEY.to_string());
        assert!(matches!(
            build_connector(&config),
            Err(ExchangeError::CredentialError(_))
        ));
    }

    #[test]
    fn test_hmac_credentials_are_rejected() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string());
        assert!(matches!(
            build_connector(&config),
            Err(ExchangeError::CredentialError(_))
        ));
    }
}
