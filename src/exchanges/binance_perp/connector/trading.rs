use crate::core::{
    errors::ExchangeError,
    kernel::RestClient,
    traits::OrderPlacer,
    types::{AssetMetadata, OrderAck, OrderParameters},
};
use crate::exchanges::binance_perp::{
    conversions::{
        build_order_params, convert_market_metadata, convert_order_response, DEFAULT_MAX_LEVERAGE,
    },
    rest::BinancePerpRestClient,
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

type SharedMarketCache = Arc<RwLock<HashMap<String, AssetMetadata>>>;

/// Trading implementation for Binance-style perpetuals
pub struct Trading<R: RestClient> {
    rest: BinancePerpRestClient<R>,
    /// Order rendering precision per symbol, filled on first use
    markets: SharedMarketCache,
}

impl<R: RestClient + Clone> Trading<R> {
    pub fn new(rest: &BinancePerpRestClient<R>) -> Self {
        Self {
            rest: rest.clone(),
            markets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn market_metadata(&self, symbol: &str) -> Result<AssetMetadata, ExchangeError> {
        if let Some(metadata) = self.markets.read().await.get(symbol) {
            return Ok(metadata.clone());
        }
        // Precision only; leverage ceiling is irrelevant for rendering
        let market = self.rest.get_market(symbol).await?;
        let metadata = convert_market_metadata(&market, DEFAULT_MAX_LEVERAGE);
        debug!(symbol, "Cached market precision");
        self.markets
            .write()
            .await
            .insert(symbol.to_string(), metadata.clone());
        Ok(metadata)
    }
}

fn parse_order_id(order_id: &str) -> Result<u64, ExchangeError> {
    order_id
        .parse()
        .map_err(|_| ExchangeError::InvalidParameters(format!("Invalid order ID format: {}", order_id)))
}

#[async_trait]
impl<R: RestClient + Clone> OrderPlacer for Trading<R> {
    #[instrument(skip(self, order), fields(exchange = self.rest.exchange(), symbol = %order.instrument, kind = ?order.kind))]
    async fn place_order(&self, order: OrderParameters) -> Result<OrderAck, ExchangeError> {
        let metadata = self.market_metadata(&order.instrument).await?;
        let params = build_order_params(&order, &metadata)?;
        let response = self.rest.place_order(&params).await?;
        convert_order_response(&response)
    }

    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn cancel_order(&self, instrument: &str, order_id: &str) -> Result<(), ExchangeError> {
        self.rest
            .cancel_order(instrument, parse_order_id(order_id)?)
            .await?;
        Ok(())
    }

    /// `allOpenOrders` is per symbol, so an account-wide cancel walks the
    /// symbols that currently have open orders.
    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn cancel_all_orders(&self, instrument: Option<&str>) -> Result<usize, ExchangeError> {
        let open = self.rest.get_open_orders(instrument).await?;
        let symbols: BTreeSet<&str> = open.iter().map(|o| o.symbol.as_str()).collect();
        for symbol in &symbols {
            self.rest.cancel_all_orders(symbol).await?;
        }
        info!(cancelled = open.len(), symbols = symbols.len(), "Cancelled open orders");
        Ok(open.len())
    }

    /// Leverage is applied even when the margin type cannot change, which
    /// the venue refuses while a position is open. The margin failure is
    /// still returned.
    #[instrument(skip(self), fields(exchange = self.rest.exchange()))]
    async fn set_leverage(
        &self,
        instrument: &str,
        leverage: u32,
        cross_margin: bool,
    ) -> Result<(), ExchangeError> {
        let margin = self.rest.change_margin_type(instrument, cross_margin).await;
        if let Err(e) = &margin {
            warn!(error = %e, "Margin type unchanged, still applying leverage");
        }

        let response = self.rest.change_leverage(instrument, leverage).await?;
        if response.leverage != leverage {
            return Err(ExchangeError::rejected(format!(
                "Leverage for {} is {} after requesting {}",
                response.symbol, response.leverage, leverage
            )));
        }
        margin.map_err(|e| {
            ExchangeError::rejected(format!(
                "Leverage set to {} but margin type unchanged: {}",
                leverage, e
            ))
        })
    }
}
