use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::{AccountInfo, MarketDataSource, OrderPlacer};
use crate::core::types::{
    AssetMetadata, Balance, OpenOrder, OrderAck, OrderParameters, Position,
};
use crate::exchanges::hyperliquid::rest::HyperliquidRest;
use async_trait::async_trait;
use rust_decimal::Decimal;

pub mod account;
pub mod market_data;
pub mod trading;

pub use account::Account;
pub use market_data::MarketData;
pub use trading::Trading;

/// Hyperliquid connector that composes all sub-trait implementations
pub struct HyperliquidConnector<R: RestClient> {
    pub market: MarketData<R>,
    pub trading: Trading<R>,
    pub account: Account<R>,
}

impl<R: RestClient + Clone> HyperliquidConnector<R> {
    pub fn new(rest: HyperliquidRest<R>) -> Self {
        Self {
            market: MarketData::new(rest.clone()),
            trading: Trading::new(rest.clone()),
            account: Account::new(rest),
        }
    }
}

// Delegate to the sub-components

#[async_trait]
impl<R: RestClient + Clone> MarketDataSource for HyperliquidConnector<R> {
    async fn get_current_price(&self, instrument: &str) -> Result<Decimal, ExchangeError> {
        self.market.get_current_price(instrument).await
    }

    async fn get_asset_metadata(&self, instrument: &str) -> Result<AssetMetadata, ExchangeError> {
        self.market.get_asset_metadata(instrument).await
    }
}

#[async_trait]
impl<R: RestClient + Clone> OrderPlacer for HyperliquidConnector<R> {
    async fn place_order(&self, order: OrderParameters) -> Result<OrderAck, ExchangeError> {
        self.trading.place_order(order).await
    }

    async fn cancel_order(&self, instrument: &str, order_id: &str) -> Result<(), ExchangeError> {
        self.trading.cancel_order(instrument, order_id).await
    }

    async fn cancel_all_orders(&self, instrument: Option<&str>) -> Result<usize, ExchangeError> {
        self.trading.cancel_all_orders(instrument).await
    }

    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> Result<(), ExchangeError> {
        self.trading
            .set_leverage(instrument, leverage, cross_margin)
            .await
    }
}

#[async_trait]
impl<R: RestClient + Clone> AccountInfo for HyperliquidConnector<R> {
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError> {
        self.account.get_account_balance().await
    }

    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        self.account.get_positions().await
    }

    async fn get_open_orders(
        &self,
        instrument: Option<&str>,
    ) -> Result<Vec<OpenOrder>, ExchangeError> {
        self.account.get_open_orders(instrument).await
    }
}
