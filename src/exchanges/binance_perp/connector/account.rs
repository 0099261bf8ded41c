use crate::core::{
    errors::ExchangeError,
    kernel::RestClient,
    traits::AccountInfo,
    types::{Balance, OpenOrder, Position},
};
use crate::exchanges::binance_perp::{
    conversions::{convert_balance, convert_open_order, convert_position},
    rest::BinancePerpRestClient,
};
use async_trait::async_trait;
use tracing::instrument;

/// Account information implementation for Binance-style perpetuals
pub struct Account<R: RestClient> {
    rest: BinancePerpRestClient<R>,
}

impl<R: RestClient + Clone> Account<R> {
    pub fn new(rest: &BinancePerpRestClient<R>) -> Self {
        Self { rest: rest.clone() }
    }
}

#[async_trait]
impl<R: RestClient + Clone> AccountInfo for Account<R> {
    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn get_account_balance(&self) -> Result<Vec<Balance>, ExchangeError> {
        let balances = self
            .rest
            .get_balance()
            .await?
            .iter()
            .map(convert_balance)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(balances
            .into_iter()
            .filter(|b| !b.total.is_zero() || !b.available.is_zero())
            .collect())
    }

    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn get_positions(&self) -> Result<Vec<Position>, ExchangeError> {
        let positions = self
            .rest
            .get_positions()
            .await?
            .iter()
            .map(convert_position)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions.into_iter().filter(Position::is_open).collect())
    }

    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn get_open_orders(
        &self,
        instrument: Option<&str>,
    ) -> Result<Vec<OpenOrder>, ExchangeError> {
        self.rest
            .get_open_orders(instrument)
            .await?
            .iter()
            .map(convert_open_order)
            .collect()
    }
}
