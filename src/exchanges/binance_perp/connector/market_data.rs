use crate::core::{
    errors::ExchangeError, kernel::RestClient, traits::MarketDataSource, types::AssetMetadata,
};
use crate::exchanges::binance_perp::{
    conversions::{
        convert_market_metadata, max_leverage_from_brackets, parse_decimal, DEFAULT_MAX_LEVERAGE,
    },
    rest::BinancePerpRestClient,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{instrument, warn};

/// Market data implementation for Binance-style perpetuals
pub struct MarketData<R: RestClient> {
    rest: BinancePerpRestClient<R>,
}

impl<R: RestClient + Clone> MarketData<R> {
    pub fn new(rest: &BinancePerpRestClient<R>) -> Self {
        Self { rest: rest.clone() }
    }

    /// The bracket endpoint is signed and occasionally unavailable; fall back
    /// to a conservative ceiling instead of failing the read.
    async fn max_leverage(&self, symbol: &str) -> u32 {
        match self.rest.get_leverage_brackets(symbol).await {
            Ok(brackets) => max_leverage_from_brackets(symbol, &brackets).unwrap_or_else(|| {
                warn!("No leverage bracket for {}, assuming {}", symbol, DEFAULT_MAX_LEVERAGE);
                DEFAULT_MAX_LEVERAGE
            }),
            Err(e) => {
                warn!(error = %e, "Failed to read leverage brackets, assuming {}", DEFAULT_MAX_LEVERAGE);
                DEFAULT_MAX_LEVERAGE
            }
        }
    }
}

#[async_trait]
impl<R: RestClient + Clone> MarketDataSource for MarketData<R> {
    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn get_current_price(&self, instrument: &str) -> Result<Decimal, ExchangeError> {
        let ticker = self.rest.get_ticker_price(instrument).await?;
        parse_decimal("price", &ticker.price)
    }

    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn get_asset_metadata(&self, instrument: &str) -> Result<AssetMetadata, ExchangeError> {
        let market = self.rest.get_market(instrument).await?;
        let max_leverage = self.max_leverage(instrument).await;
        Ok(convert_market_metadata(&market, max_leverage))
    }
}
