use crate::core::config::{ConfigError, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::registry::{ExchangeBundle, ExchangeRegistry, RegistryBuilder};
use crate::core::types::{ExchangeId, TradingType};
use crate::exchanges::{aster, binance_perp, hyperliquid};
use tracing::{debug, info};

/// Factory for creating exchange bundles
pub struct ExchangeFactory;

impl ExchangeFactory {
    /// Build the connector for `exchange` and wrap it in the orchestration surfaces.
    /// Credential problems surface here, never at request time.
    pub fn create_bundle(
        exchange: ExchangeId,
        config: &ExchangeConfig,
    ) -> Result<ExchangeBundle, ExchangeError> {
        let bundle = match exchange {
            ExchangeId::Binance => {
                ExchangeBundle::from_connector(binance_perp::build_connector(config)?)
            }
            ExchangeId::Aster => ExchangeBundle::from_connector(aster::build_connector(config)?),
            ExchangeId::Hyperliquid => {
                ExchangeBundle::from_connector(hyperliquid::build_connector(config)?)
            }
        };
        info!(
            exchange = %exchange,
            identity = %config.masked_identity(),
            testnet = config.testnet,
            "Exchange registered"
        );
        Ok(bundle)
    }

    /// Register every exchange in `configs` as a perpetual venue
    pub fn build_registry(
        configs: impl IntoIterator<Item = (ExchangeId, ExchangeConfig)>,
    ) -> Result<ExchangeRegistry, ExchangeError> {
        configs
            .into_iter()
            .try_fold(RegistryBuilder::new(), |builder, (exchange, config)| {
                builder.register(
                    exchange,
                    TradingType::Perpetual,
                    Self::create_bundle(exchange, &config)?,
                )
            })
            .map(RegistryBuilder::build)
    }

    /// Configs for every exchange with credentials in the environment.
    /// Exchanges without any credential variables are skipped.
    pub fn configs_from_env() -> Result<Vec<(ExchangeId, ExchangeConfig)>, ConfigError> {
        let mut configs = Vec::new();
        for exchange in ExchangeId::ALL {
            match ExchangeConfig::from_env(exchange.env_prefix()) {
                Ok(config) => configs.push((exchange, config)),
                Err(ConfigError::MissingEnvironmentVariable(var)) => {
                    debug!(exchange = %exchange, missing = %var, "Skipping exchange");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(configs)
    }

    pub fn registry_from_env() -> Result<ExchangeRegistry, ExchangeError> {
        Self::build_registry(Self::configs_from_env()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_registry_from_configs() {
        let registry = ExchangeFactory::build_registry(vec![
            (ExchangeId::Binance, ExchangeConfig::read_only()),
            (
                ExchangeId::Hyperliquid,
                ExchangeConfig::wallet(String::new(), None, SIGNER_KEY.to_string()).testnet(true),
            ),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry
            .resolve(ExchangeId::Hyperliquid, TradingType::Perpetual)
            .is_ok());
        assert!(matches!(
            registry.resolve(ExchangeId::Aster, TradingType::Perpetual),
            Err(ExchangeError::NotFound(_))
        ));
    }

    #[test]
    fn test_bad_credentials_fail_the_whole_build() {
        let result = ExchangeFactory::build_registry(vec![
            (ExchangeId::Binance, ExchangeConfig::read_only()),
            (
                ExchangeId::Aster,
                ExchangeConfig::new("key".to_string(), "secret".to_string()),
            ),
        ]);
        assert!(matches!(result, Err(ExchangeError::CredentialError(_))));
    }

    #[test]
    fn test_duplicate_exchange_is_rejected() {
        let result = ExchangeFactory::build_registry(vec![
            (ExchangeId::Binance, ExchangeConfig::read_only()),
            (ExchangeId::Binance, ExchangeConfig::read_only()),
        ]);
        assert!(matches!(result, Err(ExchangeError::InvalidParameters(_))));
    }
}
