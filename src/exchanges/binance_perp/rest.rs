use crate::core::errors::ExchangeError;
use crate::core::kernel::{param, Params, RestClient};
use crate::exchanges::binance_perp::types::{
    BinancePerpBalance, BinancePerpCodeResponse, BinancePerpError, BinancePerpExchangeInfo,
    BinancePerpLeverageBracket, BinancePerpLeverageBracketResponse, BinancePerpLeverageResponse,
    BinancePerpMarket, BinancePerpOpenOrder, BinancePerpOrderResponse, BinancePerpPosition,
    BinancePerpTickerPrice,
};
use tracing::{debug, instrument};

/// Error code returned when the margin type already matches the request
pub const NO_NEED_TO_CHANGE_MARGIN_TYPE: i64 = -4046;

/// Endpoint table for a Binance-style USDⓈ-M futures API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuturesEndpoints {
    pub exchange: &'static str,
    pub exchange_info: &'static str,
    pub ticker_price: &'static str,
    pub leverage_bracket: &'static str,
    pub order: &'static str,
    pub open_orders: &'static str,
    pub all_open_orders: &'static str,
    pub leverage: &'static str,
    pub margin_type: &'static str,
    pub balance: &'static str,
    pub position_risk: &'static str,
}

impl FuturesEndpoints {
    pub const BINANCE: Self = Self {
        exchange: "binance_perp",
        exchange_info: "/fapi/v1/exchangeInfo",
        ticker_price: "/fapi/v1/ticker/price",
        leverage_bracket: "/fapi/v1/leverageBracket",
        order: "/fapi/v1/order",
        open_orders: "/fapi/v1/openOrders",
        all_open_orders: "/fapi/v1/allOpenOrders",
        leverage: "/fapi/v1/leverage",
        margin_type: "/fapi/v1/marginType",
        balance: "/fapi/v2/balance",
        position_risk: "/fapi/v2/positionRisk",
    };

    /// Aster Pro API: public routes stay on v1, signed routes move to v3
    pub const ASTER: Self = Self {
        exchange: "aster",
        exchange_info: "/fapi/v1/exchangeInfo",
        ticker_price: "/fapi/v1/ticker/price",
        leverage_bracket: "/fapi/v3/leverageBracket",
        order: "/fapi/v3/order",
        open_orders: "/fapi/v3/openOrders",
        all_open_orders: "/fapi/v3/allOpenOrders",
        leverage: "/fapi/v3/leverage",
        margin_type: "/fapi/v3/marginType",
        balance: "/fapi/v3/balance",
        position_risk: "/fapi/v3/positionRisk",
    };
}

/// REST API operations for Binance-style perpetual futures
#[derive(Clone)]
pub struct BinancePerpRestClient<R: RestClient> {
    rest: R,
    endpoints: FuturesEndpoints,
}

impl<R: RestClient> BinancePerpRestClient<R> {
    pub fn new(rest: R, endpoints: FuturesEndpoints) -> Self {
        Self { rest, endpoints }
    }

    pub fn exchange(&self) -> &'static str {
        self.endpoints.exchange
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange))]
    pub async fn get_exchange_info(&self) -> Result<BinancePerpExchangeInfo, ExchangeError> {
        self.rest
            .get_json(self.endpoints.exchange_info, &[], false)
            .await
    }

    /// Trading rules for one symbol
    pub async fn get_market(&self, symbol: &str) -> Result<BinancePerpMarket, ExchangeError> {
        self.get_exchange_info()
            .await?
            .symbols
            .into_iter()
            .find(|market| market.symbol == symbol)
            .ok_or_else(|| {
                BinancePerpError::UnknownSymbol {
                    symbol: symbol.to_string(),
                }
                .into()
            })
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange, symbol = %symbol))]
    pub async fn get_ticker_price(
        &self,
        symbol: &str,
    ) -> Result<BinancePerpTickerPrice, ExchangeError> {
        self.rest
            .get_json(self.endpoints.ticker_price, &[param("symbol", symbol)], false)
            .await
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange, symbol = %symbol))]
    pub async fn get_leverage_brackets(
        &self,
        symbol: &str,
    ) -> Result<Vec<BinancePerpLeverageBracket>, ExchangeError> {
        self.rest
            .get_json::<BinancePerpLeverageBracketResponse>(
                self.endpoints.leverage_bracket,
                &[param("symbol", symbol)],
                true,
            )
            .await
            .map(BinancePerpLeverageBracketResponse::into_vec)
    }

    /// Place a new order (authenticated). `params` must already be wire-formatted.
    #[instrument(skip(self, params), fields(exchange = self.endpoints.exchange))]
    pub async fn place_order(
        &self,
        params: &Params,
    ) -> Result<BinancePerpOrderResponse, ExchangeError> {
        self.rest
            .post_form_json(self.endpoints.order, params, true)
            .await
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange, symbol = %symbol))]
    pub async fn cancel_order(
        &self,
        symbol: &str,
        order_id: u64,
    ) -> Result<BinancePerpOrderResponse, ExchangeError> {
        let params = vec![param("symbol", symbol), param("orderId", order_id)];
        self.rest
            .delete_json(self.endpoints.order, &params, true)
            .await
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange, symbol = %symbol))]
    pub async fn cancel_all_orders(
        &self,
        symbol: &str,
    ) -> Result<BinancePerpCodeResponse, ExchangeError> {
        self.rest
            .delete_json(
                self.endpoints.all_open_orders,
                &[param("symbol", symbol)],
                true,
            )
            .await
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange))]
    pub async fn get_open_orders(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<BinancePerpOpenOrder>, ExchangeError> {
        let params: Params = symbol.map(|s| param("symbol", s)).into_iter().collect();
        self.rest
            .get_json(self.endpoints.open_orders, &params, true)
            .await
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange, symbol = %symbol))]
    pub async fn change_leverage(
        &self,
        symbol: &str,
        leverage: u32,
    ) -> Result<BinancePerpLeverageResponse, ExchangeError> {
        let params = vec![param("symbol", symbol), param("leverage", leverage)];
        self.rest
            .post_form_json(self.endpoints.leverage, &params, true)
            .await
    }

    /// Switch between `CROSSED` and `ISOLATED`. "No need to change" counts as success.
    #[instrument(skip(self), fields(exchange = self.endpoints.exchange, symbol = %symbol))]
    pub async fn change_margin_type(
        &self,
        symbol: &str,
        cross_margin: bool,
    ) -> Result<(), ExchangeError> {
        let margin_type = if cross_margin { "CROSSED" } else { "ISOLATED" };
        let params = vec![param("symbol", symbol), param("marginType", margin_type)];
        match self
            .rest
            .post_form_json::<BinancePerpCodeResponse>(self.endpoints.margin_type, &params, true)
            .await
        {
            Ok(_) => Ok(()),
            Err(ExchangeError::ExchangeRejected {
                code: Some(NO_NEED_TO_CHANGE_MARGIN_TYPE),
                ..
            }) => {
                debug!("Margin type already {}", margin_type);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange))]
    pub async fn get_balance(&self) -> Result<Vec<BinancePerpBalance>, ExchangeError> {
        self.rest.get_json(self.endpoints.balance, &[], true).await
    }

    #[instrument(skip(self), fields(exchange = self.endpoints.exchange))]
    pub async fn get_positions(&self) -> Result<Vec<BinancePerpPosition>, ExchangeError> {
        self.rest
            .get_json(self.endpoints.position_risk, &[], true)
            .await
    }
}
