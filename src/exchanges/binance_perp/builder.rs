use crate::core::config::{Credentials, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig, Signer};
use crate::exchanges::binance_perp::{connector::BinancePerpConnector, rest::FuturesEndpoints};
use nonzero_ext::nonzero;
use secrecy::ExposeSecret;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::info;

pub const MAINNET_URL: &str = "https://fapi.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binancefuture.com";

/// Request weight budget is 2400/min; stay well under it
const REQUESTS_PER_SECOND: NonZeroU32 = nonzero!(20u32);

/// Shared REST assembly for every Binance-style futures venue
pub(crate) fn assemble(
    base_url: String,
    endpoints: FuturesEndpoints,
    signer: Option<Arc<dyn Signer>>,
    requests_per_second: NonZeroU32,
) -> Result<BinancePerpConnector<ReqwestRest>, ExchangeError> {
    let rest_config = RestClientConfig::new(base_url, endpoints.exchange.to_string())
        .with_timeout(30)
        .with_rate_limit(requests_per_second);

    let mut rest_builder = RestClientBuilder::new(rest_config);
    if let Some(signer) = signer {
        info!(exchange = endpoints.exchange, identity = %signer.identity(), "Signing enabled");
        rest_builder = rest_builder.with_signer(signer);
    }

    Ok(BinancePerpConnector::new(rest_builder.build()?, endpoints))
}

/// Create a Binance USDⓈ-M perpetual connector
pub fn build_connector(
    config: &ExchangeConfig,
) -> Result<BinancePerpConnector<ReqwestRest>, ExchangeError> {
    let signer: Option<Arc<dyn Signer>> = match &config.credentials {
        Credentials::None => None,
        Credentials::ApiKey {
            api_key,
            secret_key,
        } => Some(Arc::new(
            HmacSigner::new(
                api_key.expose_secret().clone(),
                secret_key.expose_secret().clone(),
            )?
            .with_recv_window(config.recv_window),
        )),
        Credentials::Wallet { .. } => {
            return Err(ExchangeError::credential(
                "Binance requires an API key and secret, not a wallet",
            ))
        }
    };

    assemble(
        config.resolve_base_url(MAINNET_URL, TESTNET_URL),
        FuturesEndpoints::BINANCE,
        signer,
        REQUESTS_PER_SECOND,
    )
}
