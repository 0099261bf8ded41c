use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use crate::core::traits::AccountInfo;
use crate::core::types::{Balance, OpenOrder, Position};
use crate::exchanges::hyperliquid::conversions;
use crate::exchanges::hyperliquid::rest::HyperliquidRest;
use async_trait::async_trait;
use tracing::instrument;

/// Account information implementation for Hyperliquid
pub struct Account<R: RestClient> {
    rest: HyperliquidRest<R>,
}

impl<R: RestClient> Account<R> {
    pub fn new(rest: HyperliquidRest<R>) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl<R: RestClient + Clone> AccountInfo for Account<R> {
    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError> {
        let state = self.rest.get_clearinghouse_state().await?;
        conversions::convert_balances(&state)
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let state = self.rest.get_clearinghouse_state().await?;
        let positions = state
            .asset_positions
            .iter()
            .map(conversions::convert_position)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions.into_iter().filter(Position::is_open).collect())
    }

    #[instrument(skip(self), fields(exchange = "hyperliquid"))]
    async fn get_open_orders(
        &self,
        instrument: Option<&str>,
    ) -> Result<Vec<OpenOrder>, ExchangeError> {
        self.rest
            .get_open_orders()
            .await?
            .iter()
            .filter(|order| instrument.map_or(true, |coin| order.coin == coin))
            .map(conversions::convert_open_order)
            .collect()
    }
}
