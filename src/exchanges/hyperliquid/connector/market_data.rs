use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::MarketDataSource;
use crate::core::types::AssetMetadata;
use crate::exchanges::hyperliquid::conversions::{
    convert_asset_metadata, find_asset, parse_decimal,
};
use crate::exchanges::hyperliquid::rest::HyperliquidRest;
use crate::exchanges::hyperliquid::types::HyperliquidError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::instrument;

/// Market data implementation for Hyperliquid
pub struct MarketData<R: RestClient> {
    rest: HyperliquidRest<R>,
}

impl<R: RestClient> MarketData<R> {
    pub fn new(rest: HyperliquidRest<R>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl<R: RestClient + Clone> MarketDataSource for MarketData<R> {
    /// Mid price from `allMids`
    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn get_current_price(&self, instrument: &str) -> Result<Decimal, ExchangeError> {
        let mids = self.rest.get_all_mids().await?;
        let mid = mids
            .get(instrument)
            .ok_or_else(|| HyperliquidError::asset_not_found(instrument))?;
        parse_decimal("mid", mid)
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn get_asset_metadata(&self, instrument: &str) -> Result<AssetMetadata, ExchangeError> {
        let meta = self.rest.get_meta().await?;
        let (_, asset) = find_asset(&meta, instrument)?;
        Ok(convert_asset_metadata(asset))
    }
}
